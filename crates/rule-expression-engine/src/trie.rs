//! 按单词索引的短语前缀树
//!
//! 用于多单词操作符（如 "Not In List"）与多单词参数名的最长匹配。
//! 单词比较不区分大小写。

use std::collections::HashMap;

#[derive(Debug)]
struct Node<V> {
    children: HashMap<String, Node<V>>,
    value: Option<V>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// 短语前缀树
#[derive(Debug)]
pub struct PhraseTrie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> PhraseTrie<V> {
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 插入短语。空白短语被忽略；已存在的短语保留先插入的值。
    ///
    /// 返回是否实际插入。
    pub fn insert(&mut self, phrase: &str, value: V) -> bool {
        let mut words = phrase.split_whitespace().peekable();
        if words.peek().is_none() {
            return false;
        }

        let mut node = &mut self.root;
        for word in words {
            node = node
                .children
                .entry(word.to_lowercase())
                .or_insert_with(Node::new);
        }

        if node.value.is_some() {
            return false;
        }
        node.value = Some(value);
        self.len += 1;
        true
    }

    /// 从 `words` 开头做最长匹配，返回匹配的单词数与对应值
    pub fn longest_match<S: AsRef<str>>(&self, words: &[S]) -> Option<(usize, &V)> {
        let mut node = &self.root;
        let mut best = None;

        for (i, word) in words.iter().enumerate() {
            match node.children.get(&word.as_ref().to_lowercase()) {
                Some(next) => {
                    node = next;
                    if let Some(value) = &node.value {
                        best = Some((i + 1, value));
                    }
                }
                None => break,
            }
        }

        best
    }

    /// 完整短语精确匹配
    pub fn get(&self, phrase: &str) -> Option<&V> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        match self.longest_match(&words) {
            Some((len, value)) if len == words.len() => Some(value),
            _ => None,
        }
    }
}

impl<V> Default for PhraseTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}
