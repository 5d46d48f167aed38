//! 快照缓存: 基础操作与批量写的原子性

mod common;

use std::sync::Arc;
use std::thread;

use common::make_tick;
use xquant::market::SnapshotCache;

#[test]
fn test_basic_ops() {
    let cache = SnapshotCache::new();
    assert_eq!(cache.size(), 0);
    assert!(cache.get("sh600000").is_none());

    cache.put(make_tick("sh600000", 10.0));
    assert_eq!(cache.size(), 1);
    let tick = cache.get("sh600000").expect("读快照");
    assert_eq!(tick.price, 10.0);

    // 返回的是副本, 改动不影响缓存
    let mut copy = cache.get("sh600000").expect("读快照");
    copy.price = 99.0;
    assert_eq!(cache.get("sh600000").expect("读快照").price, 10.0);

    cache.clear();
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_put_batch_overwrites_only_batch_codes() {
    let cache = SnapshotCache::new();
    cache.put(make_tick("sh600000", 10.0));
    cache.put(make_tick("sz000001", 8.0));

    cache.put_batch(vec![make_tick("sh600000", 11.0), make_tick("sh600519", 1500.0)]);

    assert_eq!(cache.get("sh600000").expect("读快照").price, 11.0);
    // 批外代码保持旧值
    assert_eq!(cache.get("sz000001").expect("读快照").price, 8.0);
    assert_eq!(cache.get("sh600519").expect("读快照").price, 1500.0);
}

/// 批量写与并发读交错时, 每次读要么读到整批前的值要么整批后的值
#[test]
fn test_put_batch_atomicity_under_concurrent_reads() {
    let cache = Arc::new(SnapshotCache::new());
    let codes: Vec<String> = (0..50).map(|i| format!("sh60{:04}", i)).collect();

    // 初始一代: 全部价格1.0
    cache.put_batch(codes.iter().map(|c| make_tick(c, 1.0)).collect());

    let writer_cache = Arc::clone(&cache);
    let writer_codes = codes.clone();
    let writer = thread::spawn(move || {
        // 连续写入第2~20代, 每代所有证券同价
        for generation in 2..=20 {
            let batch = writer_codes
                .iter()
                .map(|c| make_tick(c, generation as f64))
                .collect();
            writer_cache.put_batch(batch);
        }
    });

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        let codes = codes.clone();
        readers.push(thread::spawn(move || {
            for _ in 0..200 {
                // 单次读内只取一个证券, 值必须是某个完整代的价格
                for code in &codes {
                    let price = cache.get(code).expect("读快照").price;
                    assert!(
                        (1.0..=20.0).contains(&price) && price.fract() == 0.0,
                        "读到不完整批次的值: {}",
                        price
                    );
                }
            }
        }));
    }

    writer.join().expect("写线程");
    for reader in readers {
        reader.join().expect("读线程");
    }
    // 终态为最后一代
    for code in &codes {
        assert_eq!(cache.get(code).expect("读快照").price, 20.0);
    }
}
