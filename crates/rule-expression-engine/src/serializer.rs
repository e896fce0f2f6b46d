//! 正向序列化
//!
//! 将 token 序列输出为展示串（参数名称）与载荷串（参数 ID）。
//! 两者 token 数量和括号结构一致，只在参数的写法上不同。

use crate::catalog::LexicalCatalog;
use crate::error::{ExpressionError, Result};
use crate::grammar::Grammar;
use crate::models::SerializedExpression;
use crate::token::Token;
use eligibility_shared::config::ExpressionConfig;

/// 正向序列化器（无内部状态，重复调用结果一致）
pub struct ForwardSerializer<'a> {
    catalog: &'a LexicalCatalog,
    config: &'a ExpressionConfig,
}

impl<'a> ForwardSerializer<'a> {
    pub fn new(catalog: &'a LexicalCatalog, config: &'a ExpressionConfig) -> Self {
        Self { catalog, config }
    }

    /// 展示串：各 token 展示文本以单个空格连接
    pub fn display(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| match token {
                Token::Factor { value } if self.config.spaced_range_display => {
                    self.spaced_range(&tokens[..index], value)
                        .unwrap_or_else(|| value.clone())
                }
                _ => token.display_text().to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 载荷串：参数替换为十进制 ID，取值原样输出
    pub fn payload(&self, tokens: &[Token]) -> Result<String> {
        let mut parts = Vec::with_capacity(tokens.len());

        for (index, token) in tokens.iter().enumerate() {
            match token {
                Token::Parameter { name, id } => {
                    parts.push(self.resolve_id(name, *id)?.to_string());
                }
                Token::Unknown { text } => {
                    return Err(ExpressionError::AmbiguousToken {
                        index,
                        text: text.clone(),
                    });
                }
                _ => parts.push(token.display_text().to_string()),
            }
        }

        Ok(parts.join(" "))
    }

    pub fn serialize(&self, tokens: &[Token]) -> Result<SerializedExpression> {
        Ok(SerializedExpression {
            display: self.display(tokens),
            payload: self.payload(tokens)?,
        })
    }

    /// 参数 ID 必须能在目录中找到且名称完全一致（区分大小写）
    fn resolve_id(&self, name: &str, id: Option<i64>) -> Result<i64> {
        id.and_then(|id| self.catalog.parameter(id))
            .filter(|param| param.name == name)
            .map(|param| param.id)
            .ok_or_else(|| ExpressionError::UnresolvedParameterId {
                name: name.to_string(),
            })
    }

    /// 若取值是其所属参数的区间取值，返回带空格的展示形式
    fn spaced_range(&self, prefix: &[Token], value: &str) -> Option<String> {
        let grammar = Grammar::new(self.catalog);
        let parameter = grammar.governing_parameter(prefix)?;
        grammar
            .factors_of(parameter)
            .iter()
            .find(|f| f.is_range() && f.canonical_value() == value)
            .map(|f| f.spaced_value())
    }
}
