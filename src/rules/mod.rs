//! 规则引擎
//!
//! 规则按kind升序执行, 短路模式: 第一条失败即停止并报告失败的kind。
//! 注册表用有序数组+kind->下标索引, 保证遍历顺序确定可测。

pub mod rule_impl;

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::config::RuleParameter;
use crate::error::AppError;
use crate::factors::QuoteSnapshot;

/// 规则类型, 同时是排序键与忽略组键
pub type Kind = u32;

/// 无失败
pub const PASS: Kind = 0;

/// F10基本面规则
pub const KIND_RULE_F10: Kind = 1;
/// 基础行情规则
pub const KIND_RULE_BASE: Kind = 2;

/// 规则失败(正常信号, 不是程序错误)
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct RuleError {
    /// 错误码, 每组规则预留1000个号段
    pub code: i32,
    pub message: String,
}

impl RuleError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// 规则接口
///
/// Exec返回Ok表示通过; 规则不得修改快照。
pub trait Rule: Send + Sync {
    fn kind(&self) -> Kind;
    fn name(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn exec(&self, param: &RuleParameter, snapshot: &QuoteSnapshot) -> Result<(), RuleError>;
}

/// 过滤结果: 通过的kind位图 + 失败的kind + 失败原因
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// 通过的规则位图(按kind置位)
    pub passed: u64,
    /// 第一条失败规则的kind, 全通过为PASS
    pub failed: Kind,
    pub error: Option<RuleError>,
}

impl FilterOutcome {
    pub fn into_result(self) -> Result<(), RuleError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.error.is_none()
    }
}

/// 规则注册表 + 引擎
pub struct RuleRegistry {
    /// 按kind升序
    rules: Vec<Box<dyn Rule>>,
    positions: HashMap<Kind, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// 注册规则, kind冲突报错
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), AppError> {
        let kind = rule.kind();
        if self.positions.contains_key(&kind) {
            return Err(AppError::AlreadyExists(format!("规则kind={}", kind)));
        }
        let pos = self
            .rules
            .binary_search_by_key(&kind, |r| r.kind())
            .unwrap_err();
        self.rules.insert(pos, rule);
        // 插入点之后的下标整体后移
        self.positions.clear();
        for (i, r) in self.rules.iter().enumerate() {
            self.positions.insert(r.kind(), i);
        }
        Ok(())
    }

    pub fn get(&self, kind: Kind) -> Option<&dyn Rule> {
        self.positions.get(&kind).map(|&i| self.rules[i].as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 遍历执行全部规则
    ///
    /// 忽略组内的kind直接跳过; 第一条失败立即返回(短路)。
    pub fn filter(&self, param: &RuleParameter, snapshot: &QuoteSnapshot) -> FilterOutcome {
        let mut passed: u64 = 0;
        for rule in &self.rules {
            let kind = rule.kind();
            if param.ignore_rule_group.contains(&kind) {
                continue;
            }
            if let Err(e) = rule.exec(param, snapshot) {
                return FilterOutcome {
                    passed,
                    failed: kind,
                    error: Some(e),
                };
            }
            debug_assert!(kind < 64, "规则kind超出位图容量");
            passed |= 1u64 << kind;
        }
        FilterOutcome {
            passed,
            failed: PASS,
            error: None,
        }
    }

    /// 规则清单, 调试输出用
    pub fn usage_list(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let desc = if rule.description().is_empty() {
                "(无描述)"
            } else {
                rule.description()
            };
            out.push_str(&format!("kind: {}, name: {}, desc: {}\n", rule.kind(), rule.name(), desc));
        }
        out
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.len())
            .finish()
    }
}
