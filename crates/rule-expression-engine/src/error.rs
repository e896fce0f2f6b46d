//! 规则表达式引擎错误类型

use crate::grammar::KindSet;
use crate::token::TokenKind;
use thiserror::Error;

/// 词法目录错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("参数名称重复: {name}")]
    DuplicateParameter { name: String },

    #[error("参数 ID 重复: {id}")]
    DuplicateParameterId { id: i64 },

    #[error("目录数据源错误: {0}")]
    Source(String),
}

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("语法错误: 期望 {expected}, 实际 {got}")]
    GrammarViolation { expected: KindSet, got: TokenKind },

    #[error("括号未闭合: 仍有 {depth} 个左括号")]
    UnbalancedOpenParen { depth: usize },

    #[error("参数无法解析为 ID: {name}")]
    UnresolvedParameterId { name: String },

    #[error("表达式存在无法识别的片段: 位置 {index} '{text}'")]
    AmbiguousToken { index: usize, text: String },

    #[error("未知参数: {name}")]
    UnknownParameter { name: String },

    #[error("未知操作符: {symbol}")]
    UnknownOperator { symbol: String },

    #[error("未知逻辑操作符: {symbol}")]
    UnknownLogicalOperator { symbol: String },

    #[error("{kind} 的值不能为空")]
    EmptyValue { kind: TokenKind },

    #[error("Unknown 类型的 token 不能直接追加")]
    UnknownNotAppendable,

    #[error("目录错误: {0}")]
    Catalog(#[from] CatalogError),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ExpressionError {
    /// 获取错误码，供表单层映射提示文案
    pub fn code(&self) -> &'static str {
        match self {
            Self::GrammarViolation { .. } => "GRAMMAR_VIOLATION",
            Self::UnbalancedOpenParen { .. } => "UNBALANCED_OPEN_PAREN",
            Self::UnresolvedParameterId { .. } => "UNRESOLVED_PARAMETER_ID",
            Self::AmbiguousToken { .. } => "PARSE_AMBIGUITY",
            Self::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            Self::UnknownOperator { .. } => "UNKNOWN_OPERATOR",
            Self::UnknownLogicalOperator { .. } => "UNKNOWN_LOGICAL_OPERATOR",
            Self::EmptyValue { .. } => "EMPTY_VALUE",
            Self::UnknownNotAppendable => "UNKNOWN_NOT_APPENDABLE",
            Self::Catalog(_) => "CATALOG_ERROR",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }

    /// 是否可在当前编辑会话内修正（不需要重新加载目录）
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Catalog(_) | Self::JsonError(_))
    }
}

pub type Result<T> = std::result::Result<T, ExpressionError>;
