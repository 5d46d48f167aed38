use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use super::dataset::{DataSet, PluginKind, PLUGIN_MASK_BASE_DATA, PLUGIN_MASK_FEATURE};
use super::{F10Store, HistoryCache, SecurityHistory, F10};
use crate::market::QuotesProvider;
use crate::storages;

pub const KIND_KLINE: PluginKind = PLUGIN_MASK_BASE_DATA | 0x01;
pub const KIND_XDXR: PluginKind = PLUGIN_MASK_BASE_DATA | 0x02;
pub const KIND_TRANS: PluginKind = PLUGIN_MASK_BASE_DATA | 0x03;
pub const KIND_MINUTES: PluginKind = PLUGIN_MASK_BASE_DATA | 0x04;
pub const KIND_REPORT: PluginKind = PLUGIN_MASK_BASE_DATA | 0x05;
pub const KIND_F10: PluginKind = PLUGIN_MASK_FEATURE | 0x01;
pub const KIND_HISTORY: PluginKind = PLUGIN_MASK_FEATURE | 0x02;

/// 日K线数据集, 落盘 kline/<code>.csv
pub struct DataKLine {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
}

impl DataKLine {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf) -> Self {
        Self { provider, base_dir }
    }
}

#[async_trait]
impl DataSet for DataKLine {
    fn kind(&self) -> PluginKind {
        KIND_KLINE
    }
    fn key(&self) -> &str {
        "kline"
    }
    fn name(&self) -> &str {
        "日K线"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, _date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir.join("kline").join(format!("{}.csv", security_code))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let bars = self.provider.get_kline(security_code).await?;
        storages::save_csv(&self.filename(date, security_code), &bars)
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        // 修复即全量重建
        self.update(date, security_code).await
    }
}

/// 除权除息数据集, 落盘 xdxr/<code>.csv
pub struct DataXdxr {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
}

impl DataXdxr {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf) -> Self {
        Self { provider, base_dir }
    }
}

#[async_trait]
impl DataSet for DataXdxr {
    fn kind(&self) -> PluginKind {
        KIND_XDXR
    }
    fn key(&self) -> &str {
        "xdxr"
    }
    fn name(&self) -> &str {
        "除权除息"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, _date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir.join("xdxr").join(format!("{}.csv", security_code))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let events = self.provider.get_xdxr(security_code).await?;
        storages::save_csv(&self.filename(date, security_code), &events)
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

/// 分笔成交数据集, 落盘 trans/<code>/<date>.csv
pub struct DataTrans {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
}

impl DataTrans {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf) -> Self {
        Self { provider, base_dir }
    }
}

#[async_trait]
impl DataSet for DataTrans {
    fn kind(&self) -> PluginKind {
        KIND_TRANS
    }
    fn key(&self) -> &str {
        "trans"
    }
    fn name(&self) -> &str {
        "分笔成交"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir
            .join("trans")
            .join(security_code)
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let list = self.provider.get_transactions(security_code, date).await?;
        storages::save_csv(&self.filename(date, security_code), &list)
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

/// 分时数据集, 落盘 minutes/<code>/<date>.csv
pub struct DataMinutes {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
}

impl DataMinutes {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf) -> Self {
        Self { provider, base_dir }
    }
}

#[async_trait]
impl DataSet for DataMinutes {
    fn kind(&self) -> PluginKind {
        KIND_MINUTES
    }
    fn key(&self) -> &str {
        "minutes"
    }
    fn name(&self) -> &str {
        "分时数据"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir
            .join("minutes")
            .join(security_code)
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let list = self.provider.get_minutes(security_code, date).await?;
        storages::save_csv(&self.filename(date, security_code), &list)
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

/// 季报数据集, 按季度落盘 reports/<quarter>.csv
///
/// 更新以季度为粒度, 同一轮更新内只拉取一次。
pub struct DataReport {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
    done: Mutex<HashSet<String>>,
}

impl DataReport {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf) -> Self {
        Self {
            provider,
            base_dir,
            done: Mutex::new(HashSet::new()),
        }
    }
}

/// 日期所在季度, 如 2025Q2
pub fn quarter_of(date: NaiveDate) -> String {
    format!("{}Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

#[async_trait]
impl DataSet for DataReport {
    fn kind(&self) -> PluginKind {
        KIND_REPORT
    }
    fn key(&self) -> &str {
        "reports"
    }
    fn name(&self) -> &str {
        "季报数据"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        self.done.lock().expect("季报状态锁中毒").clear();
        Ok(())
    }
    fn filename(&self, date: NaiveDate, _security_code: &str) -> PathBuf {
        self.base_dir
            .join("reports")
            .join(format!("{}.csv", quarter_of(date)))
    }
    async fn update(&self, date: NaiveDate, _security_code: &str) -> Result<()> {
        let quarter = quarter_of(date);
        {
            let mut done = self.done.lock().expect("季报状态锁中毒");
            if !done.insert(quarter.clone()) {
                return Ok(());
            }
        }
        let reports = self.provider.get_quarterly_reports(&quarter).await?;
        storages::save_csv(&self.filename(date, ""), &reports)
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

/// F10特征, 落盘 f10/<code>.csv 并同步进内存库
pub struct FeatureF10 {
    provider: Arc<dyn QuotesProvider>,
    base_dir: PathBuf,
    store: Arc<F10Store>,
}

impl FeatureF10 {
    pub fn new(provider: Arc<dyn QuotesProvider>, base_dir: PathBuf, store: Arc<F10Store>) -> Self {
        Self { provider, base_dir, store }
    }
}

#[async_trait]
impl DataSet for FeatureF10 {
    fn kind(&self) -> PluginKind {
        KIND_F10
    }
    fn key(&self) -> &str {
        "f10"
    }
    fn name(&self) -> &str {
        "F10基本面"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, _date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir.join("f10").join(format!("{}.csv", security_code))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let info = self.provider.get_security_info(security_code).await?;
        let f10 = F10 {
            security_code: security_code.to_string(),
            name: info.name,
            capital: info.capital,
            free_capital: info.free_capital,
        };
        storages::save_csv(&self.filename(date, security_code), std::slice::from_ref(&f10))?;
        self.store.put(f10);
        Ok(())
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

/// 历史特征: 从日K线文件构建均线桶与5日均量, 写入内存缓存
pub struct FeatureHistory {
    base_dir: PathBuf,
    cache: Arc<HistoryCache>,
}

impl FeatureHistory {
    pub fn new(base_dir: PathBuf, cache: Arc<HistoryCache>) -> Self {
        Self { base_dir, cache }
    }
}

#[async_trait]
impl DataSet for FeatureHistory {
    fn kind(&self) -> PluginKind {
        KIND_HISTORY
    }
    fn key(&self) -> &str {
        "history"
    }
    fn name(&self) -> &str {
        "历史特征"
    }
    fn depend_on(&self) -> Vec<PluginKind> {
        vec![KIND_KLINE]
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, _date: NaiveDate, security_code: &str) -> PathBuf {
        self.base_dir.join("kline").join(format!("{}.csv", security_code))
    }
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        let path = self.filename(date, security_code);
        if !path.exists() {
            return Ok(());
        }
        let bars = storages::load_csv(&path)?;
        self.cache.put(security_code, SecurityHistory::from_kline(&bars));
        Ok(())
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_of() {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).expect("日期");
        assert_eq!(quarter_of(d(1, 15)), "2025Q1");
        assert_eq!(quarter_of(d(6, 10)), "2025Q2");
        assert_eq!(quarter_of(d(12, 31)), "2025Q4");
    }
}
