use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{KlineBar, MinuteBar, QuarterlyReport, SecurityInfo, SecurityMarginTrading, SnapshotTick, Transaction, XdxrEvent};

/// 行情数据源
///
/// 具体实现(行情网关/回放器)在引擎之外注入, 调用方只依赖本接口。
/// 单次调用的超时由实现自身保证, 引擎侧用重试次数约束总时长。
#[async_trait]
pub trait QuotesProvider: Send + Sync {
    /// 批量获取实时快照, 单批上限见 SECURITY_QUOTES_MAX
    async fn get_snapshot(&self, codes: &[String]) -> Result<Vec<SnapshotTick>>;

    /// 可用服务器数量, 用于推导并发数
    fn num_servers(&self) -> usize;

    /// 日K线(前复权)
    async fn get_kline(&self, security_code: &str) -> Result<Vec<KlineBar>>;

    /// 指定日期的分时数据
    async fn get_minutes(&self, security_code: &str, date: NaiveDate) -> Result<Vec<MinuteBar>>;

    /// 指定日期的分笔成交
    async fn get_transactions(&self, security_code: &str, date: NaiveDate) -> Result<Vec<Transaction>>;

    /// 除权除息记录
    async fn get_xdxr(&self, security_code: &str) -> Result<Vec<XdxrEvent>>;

    /// 证券基础信息(F10来源)
    async fn get_security_info(&self, security_code: &str) -> Result<SecurityInfo>;

    /// 季报数据
    async fn get_quarterly_reports(&self, quarter: &str) -> Result<Vec<QuarterlyReport>>;

    /// 两融标的列表
    async fn get_margin_trading_list(&self, date: NaiveDate) -> Result<Vec<SecurityMarginTrading>>;
}
