//! 词法目录
//!
//! 编辑会话期间只读的参数、取值、操作符快照。名称查找不区分大小写，
//! 并将连续空白视为单个空格。

use crate::error::{CatalogError, Result};
use crate::models::{CatalogSnapshot, FactorDef, ParameterDef};
use crate::token::ParameterId;
use crate::trie::PhraseTrie;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// 固定的逻辑操作符
pub const LOGICAL_OPERATORS: [&str; 2] = ["AND", "OR"];

/// 边界短语（操作符或逻辑操作符）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase {
    Operator(String),
    Logical(String),
}

/// 目录数据源（参数、取值、条件查询接口）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_parameters(&self) -> std::result::Result<Vec<ParameterDef>, CatalogError>;

    async fn fetch_factors_for_parameter(
        &self,
        id: ParameterId,
    ) -> std::result::Result<Vec<FactorDef>, CatalogError>;

    async fn fetch_operators(&self) -> std::result::Result<Vec<String>, CatalogError>;
}

/// 词法目录
#[derive(Debug)]
pub struct LexicalCatalog {
    parameters: Vec<ParameterDef>,
    by_id: HashMap<ParameterId, usize>,
    names: PhraseTrie<usize>,
    factors: HashMap<ParameterId, Vec<FactorDef>>,
    operators: Vec<String>,
    phrases: PhraseTrie<Phrase>,
}

impl LexicalCatalog {
    pub fn new(
        parameters: Vec<ParameterDef>,
        factors_by_parameter: HashMap<ParameterId, Vec<FactorDef>>,
        operators: Vec<String>,
    ) -> std::result::Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(parameters.len());
        let mut names = PhraseTrie::new();

        for (index, param) in parameters.iter().enumerate() {
            if by_id.insert(param.id, index).is_some() {
                return Err(CatalogError::DuplicateParameterId { id: param.id });
            }
            if !names.insert(&param.name, index) {
                return Err(CatalogError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
        }

        let mut phrases = PhraseTrie::new();
        for logical in LOGICAL_OPERATORS {
            phrases.insert(logical, Phrase::Logical(logical.to_string()));
        }

        let mut canonical_operators = Vec::with_capacity(operators.len());
        for op in operators {
            let canonical = normalize_whitespace(&op);
            if canonical.is_empty() {
                continue;
            }
            if phrases.insert(&canonical, Phrase::Operator(canonical.clone())) {
                canonical_operators.push(canonical);
            }
        }

        Ok(Self {
            parameters,
            by_id,
            names,
            factors: factors_by_parameter,
            operators: canonical_operators,
            phrases,
        })
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> std::result::Result<Self, CatalogError> {
        Self::new(
            snapshot.parameters,
            snapshot.factors_by_parameter,
            snapshot.operators,
        )
    }

    /// 从 JSON 快照加载
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    /// 通过外部数据源拉取完整快照
    #[instrument(skip(source))]
    pub async fn fetch(source: &dyn CatalogSource) -> std::result::Result<Self, CatalogError> {
        let parameters = source.fetch_parameters().await?;

        let mut factors = HashMap::with_capacity(parameters.len());
        for param in &parameters {
            let list = source.fetch_factors_for_parameter(param.id).await?;
            debug!(parameter_id = param.id, count = list.len(), "取值已加载");
            if !list.is_empty() {
                factors.insert(param.id, list);
            }
        }

        let operators = source.fetch_operators().await?;

        info!(
            parameters = parameters.len(),
            operators = operators.len(),
            "词法目录已加载"
        );

        Self::new(parameters, factors, operators)
    }

    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    pub fn parameter(&self, id: ParameterId) -> Option<&ParameterDef> {
        self.by_id.get(&id).map(|&index| &self.parameters[index])
    }

    /// 按名称查找参数（忽略大小写与多余空白）
    pub fn find_parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.names.get(name).map(|&index| &self.parameters[index])
    }

    /// 从 `words` 开头匹配最长的参数名
    pub fn match_parameter<S: AsRef<str>>(&self, words: &[S]) -> Option<(usize, &ParameterDef)> {
        self.names
            .longest_match(words)
            .map(|(len, &index)| (len, &self.parameters[index]))
    }

    pub fn factors_for(&self, id: ParameterId) -> &[FactorDef] {
        self.factors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_factors(&self, id: ParameterId) -> bool {
        !self.factors_for(id).is_empty()
    }

    /// 查找与规范化取值相同的目录取值
    pub fn find_factor(&self, id: ParameterId, value: &str) -> Option<&FactorDef> {
        self.factors_for(id)
            .iter()
            .find(|f| f.canonical_value().eq_ignore_ascii_case(value))
    }

    pub fn operators(&self) -> &[String] {
        &self.operators
    }

    /// 返回目录中的规范操作符写法
    pub fn find_operator(&self, symbol: &str) -> Option<&str> {
        match self.phrases.get(symbol) {
            Some(Phrase::Operator(op)) => Some(op.as_str()),
            _ => None,
        }
    }

    pub fn find_logical(&self, symbol: &str) -> Option<&'static str> {
        LOGICAL_OPERATORS
            .into_iter()
            .find(|op| op.eq_ignore_ascii_case(symbol.trim()))
    }

    /// 从 `words` 开头匹配最长的操作符或逻辑操作符短语
    pub fn match_phrase<S: AsRef<str>>(&self, words: &[S]) -> Option<(usize, &Phrase)> {
        self.phrases.longest_match(words)
    }
}

pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
