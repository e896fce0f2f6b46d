//! 规则表达式引擎数据模型

use crate::token::ParameterId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 参数定义（由参数查询接口提供）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub id: ParameterId,
    pub name: String,
}

impl ParameterDef {
    pub fn new(id: ParameterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// 取值定义
///
/// `value2` 存在时表示区间取值 `[value1, value2]`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorDef {
    pub value1: String,
    #[serde(default)]
    pub value2: Option<String>,
}

impl FactorDef {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            value1: value.into(),
            value2: None,
        }
    }

    pub fn range(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            value1: lower.into(),
            value2: Some(upper.into()),
        }
    }

    pub fn is_range(&self) -> bool {
        self.upper().is_some()
    }

    fn upper(&self) -> Option<&str> {
        self.value2
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// 规范化取值：区间为不带空格的 `A-B`
    pub fn canonical_value(&self) -> String {
        match self.upper() {
            Some(upper) => format!("{}-{}", self.value1.trim(), upper),
            None => self.value1.trim().to_string(),
        }
    }

    /// 带空格的区间展示形式 `A - B`
    pub fn spaced_value(&self) -> String {
        match self.upper() {
            Some(upper) => format!("{} - {}", self.value1.trim(), upper),
            None => self.value1.trim().to_string(),
        }
    }
}

/// 词法目录快照（JSON 格式）
///
/// ```json
/// {
///   "parameters": [{"id": 5, "name": "Age"}],
///   "factorsByParameter": {"5": [{"value1": "18"}]},
///   "operators": [">", "In List"]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub factors_by_parameter: HashMap<ParameterId, Vec<FactorDef>>,
    #[serde(default)]
    pub operators: Vec<String>,
}

/// 序列化结果，交给外部持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedExpression {
    /// 人类可读形式（参数名称）
    pub display: String,
    /// 下游评估使用的规范形式（参数 ID）
    pub payload: String,
}
