//! 通知事件生成器
//!
//! 按数量与命名规则惰性生成通知事件序列，第 i 条为
//! `{name: "{name_prefix}{i}", message: "{message_prefix}{i}"}`。

use crate::models::NotificationEvent;

/// 有界、惰性的通知事件生成器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationGenerator {
    count: usize,
    name_prefix: String,
    message_prefix: String,
}

impl NotificationGenerator {
    pub fn new(count: usize, name_prefix: &str, message_prefix: &str) -> Self {
        Self {
            count,
            name_prefix: name_prefix.to_string(),
            message_prefix: message_prefix.to_string(),
        }
    }

    /// 批次大小
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 生成第 index 条事件
    pub fn event_at(&self, index: usize) -> NotificationEvent {
        NotificationEvent {
            name: format!("{}{}", self.name_prefix, index),
            message: format!("{}{}", self.message_prefix, index),
        }
    }

    /// 按顺序惰性生成全部事件
    pub fn events(&self) -> impl ExactSizeIterator<Item = NotificationEvent> + '_ {
        (0..self.count).map(|i| self.event_at(i))
    }
}

impl Default for NotificationGenerator {
    fn default() -> Self {
        Self::new(100, "first_", "msg_")
    }
}
