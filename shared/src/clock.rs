//! 向量时钟 - 离线设备与服务端之间的因果比较
//!
//! 每个设备只递增自己的计数器。同步时服务端用 [`is_superior`] 判断
//! 设备上传的副本是否严格领先于服务端副本。
//!
//! # 比较规则
//!
//! | 情况 | 结果 |
//! |------|------|
//! | 本地任一 key 小于远端 | 不领先 (远端有本地未见的进度) |
//! | 至少一个 key 大于远端 (或远端缺失) | 领先 |
//! | 所有共享 key 相等 | 不领先 (平局服务端胜) |
//! | JSON 无法解析 | 不领先 ([`Superiority::Malformed`]) |
//!
//! 这不是完整的格合并：两个设备在不相交的 key 上各自领先时，
//! 先到达服务端的一方会被判定为领先。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// 时钟解析错误 (ClockParseFailure)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("malformed vector clock: {0}")]
    Malformed(String),
}

/// 向量时钟: device id → 单调递增计数器
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(BTreeMap<String, u64>);

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象解析，例如 `{"tablet-1": 3}`
    ///
    /// 空字符串视为空时钟 (旧设备未填写)。
    pub fn parse(json: &str) -> Result<Self, ClockError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(json).map_err(|e| ClockError::Malformed(e.to_string()))
    }

    /// 编码为 wire 格式 (JSON 字符串)
    pub fn encode(&self) -> String {
        // BTreeMap<String, u64> 序列化不会失败
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// 递增指定设备的计数器，返回新值
    pub fn tick(&mut self, device_id: &str) -> u64 {
        let counter = self.0.entry(device_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn get(&self, device_id: &str) -> u64 {
        self.0.get(device_id).copied().unwrap_or(0)
    }

    /// 逐项取最大值
    pub fn merge(&mut self, other: &VectorClock) {
        for (device, &value) in &other.0 {
            let entry = self.0.entry(device.clone()).or_insert(0);
            if value > *entry {
                *entry = value;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }
}

impl<const N: usize> From<[(&str, u64); N]> for VectorClock {
    fn from(entries: [(&str, u64); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// 判断本地时钟是否严格领先远端
pub fn is_superior(local: &VectorClock, remote: &VectorClock) -> bool {
    let mut greater_at_least_once = false;
    for (device, &local_value) in local.iter() {
        match remote.0.get(device) {
            Some(&remote_value) if local_value < remote_value => return false,
            Some(&remote_value) if local_value > remote_value => greater_at_least_once = true,
            Some(_) => {}
            None => greater_at_least_once = true,
        }
    }
    greater_at_least_once
}

/// 对编码后时钟的比较结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Superiority {
    Superior,
    NotSuperior,
    /// 任一侧无法解析 - 失败关闭，服务端胜
    Malformed(ClockError),
}

impl Superiority {
    pub fn is_superior(&self) -> bool {
        matches!(self, Superiority::Superior)
    }
}

/// 比较两个 wire 格式的时钟
pub fn compare_encoded(local_json: &str, remote_json: &str) -> Superiority {
    let local = match VectorClock::parse(local_json) {
        Ok(c) => c,
        Err(e) => return Superiority::Malformed(e),
    };
    let remote = match VectorClock::parse(remote_json) {
        Ok(c) => c,
        Err(e) => return Superiority::Malformed(e),
    };
    if is_superior(&local, &remote) {
        Superiority::Superior
    } else {
        Superiority::NotSuperior
    }
}

/// 完整偏序关系 (仅用于日志观测)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOrdering {
    Equal,
    Before,
    After,
    Concurrent,
}

pub fn ordering(a: &VectorClock, b: &VectorClock) -> ClockOrdering {
    let mut a_ahead = false;
    let mut b_ahead = false;
    let keys = a.0.keys().chain(b.0.keys());
    for key in keys {
        let (av, bv) = (a.get(key), b.get(key));
        if av > bv {
            a_ahead = true;
        } else if bv > av {
            b_ahead = true;
        }
    }
    match (a_ahead, b_ahead) {
        (false, false) => ClockOrdering::Equal,
        (true, false) => ClockOrdering::After,
        (false, true) => ClockOrdering::Before,
        (true, true) => ClockOrdering::Concurrent,
    }
}
