//! 数据集更新器: 全量调度 / 单证券panic隔离 / 落盘

mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use common::MockProvider;
use xquant::factors::dataset_impl::{DataKLine, FeatureF10};
use xquant::factors::{DataSet, DataSetRegistry, F10Store, OpKind, PluginKind, PLUGIN_MASK_FEATURE};
use xquant::storages::dataset_update;

/// 记录调用并按需panic的测试插件
struct ProbeDataSet {
    kind: PluginKind,
    calls: Arc<AtomicUsize>,
    panic_on: Option<String>,
}

#[async_trait]
impl DataSet for ProbeDataSet {
    fn kind(&self) -> PluginKind {
        self.kind
    }
    fn key(&self) -> &str {
        "probe"
    }
    fn name(&self) -> &str {
        "探针数据集"
    }
    async fn init(&self, _date: NaiveDate) -> Result<()> {
        Ok(())
    }
    fn filename(&self, _date: NaiveDate, security_code: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/probe/{}.csv", security_code))
    }
    async fn update(&self, _date: NaiveDate, security_code: &str) -> Result<()> {
        if self.panic_on.as_deref() == Some(security_code) {
            panic!("模拟单证券崩溃");
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()> {
        self.update(date, security_code).await
    }
}

#[tokio::test]
async fn test_update_covers_all_codes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin: Arc<dyn DataSet> = Arc::new(ProbeDataSet {
        kind: PLUGIN_MASK_FEATURE | 0x70,
        calls: Arc::clone(&calls),
        panic_on: None,
    });
    let codes: Vec<String> = (0..50).map(|i| format!("sh60{:04}", i)).collect();
    dataset_update(common::test_date(), &codes, &[plugin], OpKind::Update).await;
    assert_eq!(calls.load(Ordering::SeqCst), 50);
}

/// 单证券panic被隔离, 其余证券继续处理
#[tokio::test]
async fn test_panic_isolated_per_security() {
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin: Arc<dyn DataSet> = Arc::new(ProbeDataSet {
        kind: PLUGIN_MASK_FEATURE | 0x71,
        calls: Arc::clone(&calls),
        panic_on: Some("sh600010".to_string()),
    });
    let codes: Vec<String> = (0..30).map(|i| format!("sh60{:04}", i)).collect();
    dataset_update(common::test_date(), &codes, &[plugin], OpKind::Update).await;
    // 崩溃的那只之外全部完成
    assert_eq!(calls.load(Ordering::SeqCst), 29);
}

/// 真实插件落盘: K线csv + F10写入内存库
#[tokio::test]
async fn test_kline_and_f10_plugins_write_outputs() {
    let dir = tempfile::tempdir().expect("临时目录");
    let provider = Arc::new(MockProvider::new());
    let f10_store = Arc::new(F10Store::new());

    let registry = DataSetRegistry::new();
    registry
        .register(Arc::new(DataKLine::new(
            provider.clone() as Arc<dyn xquant::market::QuotesProvider>,
            dir.path().to_path_buf(),
        )))
        .expect("注册K线插件");
    registry
        .register(Arc::new(FeatureF10::new(
            provider as Arc<dyn xquant::market::QuotesProvider>,
            dir.path().to_path_buf(),
            Arc::clone(&f10_store),
        )))
        .expect("注册F10插件");

    let codes = vec!["sh600000".to_string()];
    let plugins = registry.plugins(0);
    assert_eq!(plugins.len(), 2);
    dataset_update(common::test_date(), &codes, &plugins, OpKind::Update).await;

    assert!(dir.path().join("kline").join("sh600000.csv").exists());
    assert!(dir.path().join("f10").join("sh600000.csv").exists());
    let f10 = f10_store.get("sh600000").expect("F10入库");
    assert_eq!(f10.free_capital, 5.0);
}

#[tokio::test]
async fn test_registry_rejects_duplicate_kind() {
    let registry = DataSetRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    registry
        .register(Arc::new(ProbeDataSet {
            kind: PLUGIN_MASK_FEATURE | 0x72,
            calls: Arc::clone(&calls),
            panic_on: None,
        }))
        .expect("首次注册");
    let dup = registry.register(Arc::new(ProbeDataSet {
        kind: PLUGIN_MASK_FEATURE | 0x72,
        calls,
        panic_on: None,
    }));
    assert!(dup.is_err());
}
