//! 语法状态机
//!
//! 根据序列末尾 token 的类型与括号深度推导当前状态，并给出允许追加的
//! token 类型集合。状态总是由序列重新计算，不缓存任何开关标志。

use crate::catalog::LexicalCatalog;
use crate::error::{ExpressionError, Result};
use crate::models::FactorDef;
use crate::token::{ParameterId, Token, TokenKind};
use serde::{Serialize, Serializer};
use std::fmt;

/// token 类型集合
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KindSet(u8);

impl KindSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_kinds(kinds: &[TokenKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, &k| set.with(k))
    }

    pub fn with(mut self, kind: TokenKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: TokenKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenKind> + '_ {
        TokenKind::CONCRETE
            .into_iter()
            .chain(std::iter::once(TokenKind::Unknown))
            .filter(|k| self.contains(*k))
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for KindSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// 语法状态（由最后一个 token 的类型决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarState {
    Start,
    AfterOpenParen,
    AfterParameter,
    AfterOperator,
    AfterFactor,
    AfterLogicalOperator,
    AfterCloseParen,
    /// 反向解析留下的未识别片段之后，放宽限制以便用户修正
    AfterUnknown,
}

impl GrammarState {
    pub fn from_tail(last: Option<&Token>) -> Self {
        match last.map(Token::kind) {
            None => Self::Start,
            Some(TokenKind::OpenParen) => Self::AfterOpenParen,
            Some(TokenKind::Parameter) => Self::AfterParameter,
            Some(TokenKind::Operator) => Self::AfterOperator,
            Some(TokenKind::Factor) => Self::AfterFactor,
            Some(TokenKind::LogicalOperator) => Self::AfterLogicalOperator,
            Some(TokenKind::CloseParen) => Self::AfterCloseParen,
            Some(TokenKind::Unknown) => Self::AfterUnknown,
        }
    }
}

/// 序列当前的语法快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrammarSnapshot {
    pub state: GrammarState,
    /// 未闭合的左括号数量
    pub depth: usize,
    pub legal_next: KindSet,
}

/// 语法状态机
pub struct Grammar<'a> {
    catalog: &'a LexicalCatalog,
}

impl<'a> Grammar<'a> {
    pub fn new(catalog: &'a LexicalCatalog) -> Self {
        Self { catalog }
    }

    /// 从序列推导状态、深度与允许的下一类 token
    pub fn analyze(&self, tokens: &[Token]) -> GrammarSnapshot {
        let last = tokens.last();
        let state = GrammarState::from_tail(last);
        let depth = paren_depth(tokens);
        let free_text = last.is_some_and(|t| self.is_free_text_parameter(t));

        GrammarSnapshot {
            state,
            depth,
            legal_next: Self::legal_for(state, depth, free_text),
        }
    }

    /// 检查 `kind` 能否追加到 `tokens` 之后
    pub fn check_append(&self, tokens: &[Token], kind: TokenKind) -> Result<GrammarSnapshot> {
        let snapshot = self.analyze(tokens);
        if snapshot.legal_next.contains(kind) {
            Ok(snapshot)
        } else {
            Err(ExpressionError::GrammarViolation {
                expected: snapshot.legal_next,
                got: kind,
            })
        }
    }

    /// 找出在其前缀下不合法的 token 位置
    ///
    /// 不合法的 token 按 Unknown 处理后继续推导，因此后续位置的判断
    /// 与把这些 token 替换成 Unknown 之后的序列一致。
    pub fn violations(&self, tokens: &[Token]) -> Vec<usize> {
        let mut invalid = Vec::new();
        let mut state = GrammarState::Start;
        let mut depth = 0usize;
        let mut free_text = false;

        for (index, token) in tokens.iter().enumerate() {
            let legal = Self::legal_for(state, depth, free_text);
            let kind = token.kind();

            if !legal.contains(kind) {
                if kind != TokenKind::Unknown {
                    invalid.push(index);
                }
                state = GrammarState::AfterUnknown;
                free_text = false;
                continue;
            }

            match kind {
                TokenKind::OpenParen => depth += 1,
                TokenKind::CloseParen => depth -= 1,
                _ => {}
            }
            state = GrammarState::from_tail(Some(token));
            free_text = self.is_free_text_parameter(token);
        }

        invalid
    }

    /// 最后一个参数 token（当前表达式分句的主体）
    pub fn governing_parameter<'t>(&self, tokens: &'t [Token]) -> Option<&'t Token> {
        tokens.iter().rev().find(|t| t.is_parameter())
    }

    /// 当前可供选择的取值列表
    ///
    /// 仅在刚选中参数或操作符之后返回，其余状态下为空。
    pub fn active_factors(&self, tokens: &[Token]) -> Vec<FactorDef> {
        match GrammarState::from_tail(tokens.last()) {
            GrammarState::AfterParameter | GrammarState::AfterOperator => self
                .governing_parameter(tokens)
                .map(|t| self.factors_of(t).to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// 参数 token 对应的目录 ID；缺少 ID 时按名称查找
    pub fn parameter_id(&self, token: &Token) -> Option<ParameterId> {
        match token {
            Token::Parameter { id: Some(id), .. } => Some(*id),
            Token::Parameter { name, id: None } => self.catalog.find_parameter(name).map(|p| p.id),
            _ => None,
        }
    }

    /// 参数 token 在目录中的取值列表；无法定位时视为无取值
    pub fn factors_of(&self, token: &Token) -> &'a [FactorDef] {
        let catalog = self.catalog;
        self.parameter_id(token)
            .map(|id| catalog.factors_for(id))
            .unwrap_or(&[])
    }

    fn is_free_text_parameter(&self, token: &Token) -> bool {
        token.is_parameter() && self.factors_of(token).is_empty()
    }

    fn legal_for(state: GrammarState, depth: usize, free_text_parameter: bool) -> KindSet {
        use TokenKind::*;

        let mut set = match state {
            GrammarState::Start | GrammarState::AfterLogicalOperator => {
                KindSet::from_kinds(&[Parameter, OpenParen])
            }
            GrammarState::AfterOpenParen => KindSet::from_kinds(&[Parameter]),
            GrammarState::AfterParameter => {
                let set = KindSet::from_kinds(&[Operator]);
                if free_text_parameter {
                    set.with(OpenParen)
                } else {
                    set
                }
            }
            GrammarState::AfterOperator => KindSet::from_kinds(&[Factor]),
            GrammarState::AfterFactor | GrammarState::AfterCloseParen => {
                KindSet::from_kinds(&[LogicalOperator])
            }
            GrammarState::AfterUnknown => {
                KindSet::from_kinds(&[Parameter, Factor, Operator, LogicalOperator, OpenParen])
            }
        };

        let closable = matches!(
            state,
            GrammarState::AfterFactor | GrammarState::AfterCloseParen | GrammarState::AfterUnknown
        );
        if closable && depth > 0 {
            set.insert(CloseParen);
        }

        set
    }
}

/// 未闭合的左括号数量
pub fn paren_depth(tokens: &[Token]) -> usize {
    tokens.iter().fold(0usize, |depth, t| match t {
        Token::OpenParen => depth + 1,
        Token::CloseParen => depth.saturating_sub(1),
        _ => depth,
    })
}
