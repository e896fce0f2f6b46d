//! 表达式 token 定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 参数标识（目录中的数值 ID）
pub type ParameterId = i64;

/// token 类型（不含取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenKind {
    Parameter,
    Factor,
    Operator,
    LogicalOperator,
    OpenParen,
    CloseParen,
    /// 仅由反向解析产生，表示无法确定类型的片段
    Unknown,
}

impl TokenKind {
    /// 可由调用方追加的具体类型
    pub const CONCRETE: [TokenKind; 6] = [
        TokenKind::Parameter,
        TokenKind::Factor,
        TokenKind::Operator,
        TokenKind::LogicalOperator,
        TokenKind::OpenParen,
        TokenKind::CloseParen,
    ];

    pub(crate) fn bit(self) -> u8 {
        match self {
            Self::Parameter => 1 << 0,
            Self::Factor => 1 << 1,
            Self::Operator => 1 << 2,
            Self::LogicalOperator => 1 << 3,
            Self::OpenParen => 1 << 4,
            Self::CloseParen => 1 << 5,
            Self::Unknown => 1 << 6,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parameter => "Parameter",
            Self::Factor => "Factor",
            Self::Operator => "Operator",
            Self::LogicalOperator => "LogicalOperator",
            Self::OpenParen => "OpenParen",
            Self::CloseParen => "CloseParen",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// 表达式中的一个元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    /// 参数；`id` 为空表示反向解析时无法在目录中定位
    Parameter {
        name: String,
        id: Option<ParameterId>,
    },
    /// 取值，区间已规范化为 `A-B`
    Factor { value: String },
    /// 比较操作符，可能包含多个单词（如 "Not In List"）
    Operator { symbol: String },
    /// AND / OR，统一大写
    LogicalOperator { symbol: String },
    OpenParen,
    CloseParen,
    Unknown { text: String },
}

impl Token {
    pub fn parameter(name: impl Into<String>, id: ParameterId) -> Self {
        Self::Parameter {
            name: name.into(),
            id: Some(id),
        }
    }

    pub fn factor(value: impl Into<String>) -> Self {
        Self::Factor {
            value: value.into(),
        }
    }

    pub fn operator(symbol: impl Into<String>) -> Self {
        Self::Operator {
            symbol: symbol.into(),
        }
    }

    pub fn logical(symbol: impl AsRef<str>) -> Self {
        Self::LogicalOperator {
            symbol: symbol.as_ref().to_uppercase(),
        }
    }

    pub fn and() -> Self {
        Self::logical("AND")
    }

    pub fn or() -> Self {
        Self::logical("OR")
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Parameter { .. } => TokenKind::Parameter,
            Self::Factor { .. } => TokenKind::Factor,
            Self::Operator { .. } => TokenKind::Operator,
            Self::LogicalOperator { .. } => TokenKind::LogicalOperator,
            Self::OpenParen => TokenKind::OpenParen,
            Self::CloseParen => TokenKind::CloseParen,
            Self::Unknown { .. } => TokenKind::Unknown,
        }
    }

    /// 展示文本（参数取名称）
    pub fn display_text(&self) -> &str {
        match self {
            Self::Parameter { name, .. } => name,
            Self::Factor { value } => value,
            Self::Operator { symbol } | Self::LogicalOperator { symbol } => symbol,
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Unknown { text } => text,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter { .. })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}
