use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("数值范围格式错误: {0}")]
    ValueFormat(String),
    #[error("时间范围格式错误: {0}")]
    TimeFormat(String),
}

/// 数值范围, 文本形态 "min~max"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    begin: f64,
    end: f64,
}

impl Serialize for ValueRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl ValueRange {
    pub fn new(begin: f64, end: f64) -> Self {
        if begin > end {
            Self { begin: end, end: begin }
        } else {
            Self { begin, end }
        }
    }

    /// 检查是否包含在范围内
    pub fn contains(&self, v: f64) -> bool {
        v >= self.begin && v <= self.end
    }

    pub fn begin(&self) -> f64 {
        self.begin
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.begin, self.end)
    }
}

impl FromStr for ValueRange {
    type Err = RangeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = text.split('~').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(RangeError::ValueFormat(text.to_string()));
        }
        let begin: f64 = parts[0]
            .parse()
            .map_err(|_| RangeError::ValueFormat(text.to_string()))?;
        let end: f64 = parts[1]
            .parse()
            .map_err(|_| RangeError::ValueFormat(text.to_string()))?;
        Ok(Self::new(begin, end))
    }
}

impl<'de> Deserialize<'de> for ValueRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// 时间范围, 文本形态 "HH:MM:SS~HH:MM:SS"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    begin: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(begin: NaiveTime, end: NaiveTime) -> Self {
        if begin > end {
            Self { begin: end, end: begin }
        } else {
            Self { begin, end }
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.begin && t <= self.end
    }
}

impl FromStr for TimeRange {
    type Err = RangeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = text.split('~').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(RangeError::TimeFormat(text.to_string()));
        }
        let begin = NaiveTime::parse_from_str(parts[0], "%H:%M:%S")
            .map_err(|_| RangeError::TimeFormat(text.to_string()))?;
        let end = NaiveTime::parse_from_str(parts[1], "%H:%M:%S")
            .map_err(|_| RangeError::TimeFormat(text.to_string()))?;
        Ok(Self::new(begin, end))
    }
}

/// 交易时段, 多段用逗号分隔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSession {
    ranges: Vec<TimeRange>,
}

impl TradingSession {
    pub fn new(ranges: Vec<TimeRange>) -> Self {
        Self { ranges }
    }

    /// 指定时刻是否处于时段内
    pub fn is_trading(&self, t: NaiveTime) -> bool {
        self.ranges.iter().any(|r| r.contains(t))
    }
}

impl Default for TradingSession {
    fn default() -> Self {
        // 默认全交易时段
        "09:30:00~11:30:00,13:00:00~14:56:59"
            .parse()
            .expect("默认交易时段常量不合法")
    }
}

impl FromStr for TradingSession {
    type Err = RangeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            ranges.push(part.parse::<TimeRange>()?);
        }
        if ranges.is_empty() {
            return Err(RangeError::TimeFormat(text.to_string()));
        }
        Ok(Self { ranges })
    }
}

impl<'de> Deserialize<'de> for TradingSession {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for TradingSession {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let text = self
            .ranges
            .iter()
            .map(|r| format!("{}~{}", r.begin.format("%H:%M:%S"), r.end.format("%H:%M:%S")))
            .collect::<Vec<_>>()
            .join(",");
        serializer.serialize_str(&text)
    }
}
