//! 已访问地址跟踪
//!
//! 每次扫描独立持有一个跟踪器，只在编排任务里顺序调用，
//! 不跨扫描、也不跨线程共享。

use std::collections::HashSet;
use std::net::Ipv4Addr;

/// 记录本次扫描中已经反查过的地址
#[derive(Debug, Default)]
pub struct VisitedTracker {
    visited: HashSet<Ipv4Addr>,
}

impl VisitedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回候选中从未出现过的地址（保持候选顺序），并把候选并入已访问集合
    pub fn filter_new(&mut self, candidates: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
        candidates
            .iter()
            .copied()
            .filter(|ip| self.visited.insert(*ip))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
