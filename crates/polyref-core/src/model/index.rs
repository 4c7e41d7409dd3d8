//! 按位置索引的去重插入
//!
//! 模型实体的相等性都包含位置，因此只需与同一位置上的已有元素比较。

use super::location::Location;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct LocationIndex {
    slots: HashMap<Location, Vec<usize>>,
    indexed: usize,
}

impl LocationIndex {
    /// 加入 `item`；与已有元素相等时忽略并返回 `false`
    ///
    /// 向量在索引之外被改变长度时先重建索引。
    pub(crate) fn push_unique<T, F>(&mut self, items: &mut Vec<T>, item: T, location: F) -> bool
    where
        T: PartialEq,
        F: Fn(&T) -> &Location,
    {
        if self.indexed != items.len() {
            self.rebuild(items, &location);
        }
        let key = location(&item).clone();
        let slots = self.slots.entry(key).or_default();
        if slots.iter().any(|&position| items.get(position) == Some(&item)) {
            return false;
        }
        slots.push(items.len());
        items.push(item);
        self.indexed = items.len();
        true
    }

    fn rebuild<T, F>(&mut self, items: &[T], location: &F)
    where
        F: Fn(&T) -> &Location,
    {
        self.slots.clear();
        for (position, item) in items.iter().enumerate() {
            self.slots
                .entry(location(item).clone())
                .or_default()
                .push(position);
        }
        self.indexed = items.len();
    }
}
