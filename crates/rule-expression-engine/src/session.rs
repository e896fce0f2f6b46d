//! 表达式编辑会话
//!
//! 规则、例外、卡片表单共用的有状态入口。每个会话持有一份只读目录快照与
//! 当前 token 序列；所有开关状态都由序列实时推导。

use crate::catalog::LexicalCatalog;
use crate::error::{ExpressionError, Result};
use crate::grammar::{Grammar, GrammarSnapshot, GrammarState, KindSet};
use crate::models::{FactorDef, SerializedExpression};
use crate::parser::{ParseAmbiguity, ReverseParser, normalize_factor};
use crate::serializer::ForwardSerializer;
use crate::token::{Token, TokenKind};
use eligibility_shared::config::ExpressionConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 每次编辑操作后返回给表单的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub state: GrammarState,
    pub depth: usize,
    /// 允许追加的 token 类型，用于启用 / 禁用输入控件
    pub legal_next: KindSet,
    /// 刚选中参数或操作符时，该参数的可选取值
    pub factors: Vec<FactorDef>,
    pub display: String,
    /// 存在无法解析的参数或 Unknown 片段时为空
    pub payload: Option<String>,
}

/// 表达式编辑会话
pub struct EditSession {
    id: Uuid,
    catalog: Arc<LexicalCatalog>,
    config: ExpressionConfig,
    tokens: Vec<Token>,
}

impl EditSession {
    /// 新建空表达式
    pub fn new(catalog: Arc<LexicalCatalog>) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            config: ExpressionConfig::default(),
            tokens: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ExpressionConfig) -> Self {
        self.config = config;
        self
    }

    /// 打开已保存的规则：从展示串还原 token 序列
    pub fn load_for_edit(catalog: Arc<LexicalCatalog>, expression: &str) -> Self {
        let mut session = Self::new(catalog);
        let parsed = ReverseParser::new(&session.catalog).parse(expression);

        info!(
            session_id = %session.id,
            tokens = parsed.tokens.len(),
            ambiguities = parsed.ambiguities.len(),
            "已加载表达式进行编辑"
        );

        session.tokens = parsed.tokens;
        session
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &LexicalCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ExpressionConfig {
        &self.config
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn snapshot(&self) -> GrammarSnapshot {
        Grammar::new(&self.catalog).analyze(&self.tokens)
    }

    pub fn state(&self) -> GrammarState {
        self.snapshot().state
    }

    pub fn depth(&self) -> usize {
        self.snapshot().depth
    }

    pub fn legal_next(&self) -> KindSet {
        self.snapshot().legal_next
    }

    /// 当前序列中仍未识别的片段
    pub fn ambiguities(&self) -> Vec<ParseAmbiguity> {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(index, token)| match token {
                Token::Unknown { text } => Some(ParseAmbiguity {
                    index,
                    text: text.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn display(&self) -> String {
        self.serializer().display(&self.tokens)
    }

    /// 按类型与输入值追加 token
    ///
    /// 先做语法检查，再按目录解析取值：参数名解析为 ID，操作符取目录中的
    /// 规范写法，逻辑操作符转为大写，取值中的区间规范为 `A-B`。括号忽略 `value`。
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn append(&mut self, kind: TokenKind, value: &str) -> Result<EditOutcome> {
        if kind == TokenKind::Unknown {
            return Err(ExpressionError::UnknownNotAppendable);
        }

        self.check_grammar(kind)?;
        let token = self.resolve(kind, value)?;
        Ok(self.push(token))
    }

    /// 追加已构造好的 token
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn append_token(&mut self, token: Token) -> Result<EditOutcome> {
        if token.kind() == TokenKind::Unknown {
            return Err(ExpressionError::UnknownNotAppendable);
        }

        self.check_grammar(token.kind())?;

        if let Token::Parameter { name, id } = &token {
            let resolved = id
                .and_then(|id| self.catalog.parameter(id))
                .is_some_and(|param| &param.name == name);
            if !resolved {
                return Err(ExpressionError::UnresolvedParameterId { name: name.clone() });
            }
        }

        Ok(self.push(token))
    }

    /// 追加目录中的取值定义（区间输出为 `A-B`）
    pub fn append_factor(&mut self, factor: &FactorDef) -> Result<EditOutcome> {
        self.append_token(Token::factor(factor.canonical_value()))
    }

    /// 撤销最后一个 token；空序列时无操作
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn remove_last(&mut self) -> EditOutcome {
        if let Some(token) = self.tokens.pop() {
            debug!(kind = %token.kind(), "已移除 token");
        }
        self.outcome()
    }

    /// 清空表达式
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reset(&mut self) -> EditOutcome {
        self.tokens.clear();
        self.outcome()
    }

    /// 完成编辑，返回展示串与载荷串
    ///
    /// 失败时会话保持可编辑。
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn finalize(&self) -> Result<SerializedExpression> {
        let depth = self.depth();
        if depth > 0 {
            warn!(depth, "括号未闭合");
            return Err(ExpressionError::UnbalancedOpenParen { depth });
        }

        let result = self.serializer().serialize(&self.tokens)?;
        info!(display = %result.display, payload = %result.payload, "表达式已完成");
        Ok(result)
    }

    /// 当前状态（不做任何修改）
    pub fn outcome(&self) -> EditOutcome {
        let grammar = Grammar::new(&self.catalog);
        let snapshot = grammar.analyze(&self.tokens);
        let serializer = self.serializer();

        EditOutcome {
            state: snapshot.state,
            depth: snapshot.depth,
            legal_next: snapshot.legal_next,
            factors: grammar.active_factors(&self.tokens),
            display: serializer.display(&self.tokens),
            payload: serializer.payload(&self.tokens).ok(),
        }
    }

    fn serializer(&self) -> ForwardSerializer<'_> {
        ForwardSerializer::new(&self.catalog, &self.config)
    }

    fn check_grammar(&self, kind: TokenKind) -> Result<()> {
        Grammar::new(&self.catalog)
            .check_append(&self.tokens, kind)
            .map(|_| ())
            .inspect_err(|e| warn!(error = %e, "拒绝追加"))
    }

    fn resolve(&self, kind: TokenKind, value: &str) -> Result<Token> {
        let value = value.trim();
        let require_value = || {
            if value.is_empty() {
                Err(ExpressionError::EmptyValue { kind })
            } else {
                Ok(())
            }
        };

        match kind {
            TokenKind::Parameter => {
                require_value()?;
                self.catalog
                    .find_parameter(value)
                    .map(|p| Token::parameter(p.name.clone(), p.id))
                    .ok_or_else(|| ExpressionError::UnknownParameter {
                        name: value.to_string(),
                    })
            }
            TokenKind::Factor => {
                require_value()?;
                Ok(Token::factor(normalize_factor(value)))
            }
            TokenKind::Operator => {
                require_value()?;
                self.catalog
                    .find_operator(value)
                    .map(Token::operator)
                    .ok_or_else(|| ExpressionError::UnknownOperator {
                        symbol: value.to_string(),
                    })
            }
            TokenKind::LogicalOperator => {
                require_value()?;
                self.catalog
                    .find_logical(value)
                    .map(Token::logical)
                    .ok_or_else(|| ExpressionError::UnknownLogicalOperator {
                        symbol: value.to_string(),
                    })
            }
            TokenKind::OpenParen => Ok(Token::OpenParen),
            TokenKind::CloseParen => Ok(Token::CloseParen),
            TokenKind::Unknown => Err(ExpressionError::UnknownNotAppendable),
        }
    }

    fn push(&mut self, token: Token) -> EditOutcome {
        debug!(kind = %token.kind(), value = %token, "已追加 token");
        self.tokens.push(token);
        self.outcome()
    }
}
