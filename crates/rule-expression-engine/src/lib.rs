//! 资格规则表达式引擎
//!
//! 提供规则 / 例外 / 卡片表单共用的表达式编辑能力，支持：
//! - 基于语法状态机的 token 追加与撤销
//! - 展示串（参数名称）与载荷串（参数 ID）两种序列化
//! - 从已保存的展示串反向解析出 token 序列
//! - 词法目录（参数、取值、操作符）快照与外部数据源抽象

pub mod catalog;
pub mod error;
pub mod grammar;
pub mod models;
pub mod parser;
pub mod serializer;
pub mod session;
pub mod token;
pub mod trie;

pub use catalog::{CatalogSource, LOGICAL_OPERATORS, LexicalCatalog, Phrase};
pub use error::{CatalogError, ExpressionError, Result};
pub use grammar::{Grammar, GrammarSnapshot, GrammarState, KindSet};
pub use models::{CatalogSnapshot, FactorDef, ParameterDef, SerializedExpression};
pub use parser::{ParseAmbiguity, ParsedExpression, ReverseParser};
pub use serializer::ForwardSerializer;
pub use session::{EditOutcome, EditSession};
pub use token::{ParameterId, Token, TokenKind};

pub use eligibility_shared::config::ExpressionConfig;
