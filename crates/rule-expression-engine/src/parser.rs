//! 反向解析
//!
//! 将已保存的展示串还原为 token 序列。参数名和取值可以包含空格，操作符
//! 可以是多个单词，因此按目录做最长匹配来确定单词边界：
//!
//! 1. 在括号两侧补空格后按空白切分单词
//! 2. 优先匹配最长的操作符 / 逻辑操作符短语
//! 3. 其余单词组成连续片段，取最长的参数名前缀，否则整段视为取值
//! 4. 取值片段中夹带的 AND / OR 拆分为逻辑操作符
//! 5. 操作符前的取值改判为参数，操作符后的参数改判为取值
//! 6. 不符合语法的 token 标记为 Unknown
//!
//! 解析本身不会失败，Unknown 的位置通过 [`ParseAmbiguity`] 报告。

use crate::catalog::{LexicalCatalog, Phrase};
use crate::grammar::Grammar;
use crate::token::Token;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// 匹配取值片段中夹带的逻辑操作符
static EMBEDDED_LOGICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(AND|OR)\b").expect("logical operator pattern"));

/// 匹配带空格的区间写法 `A - B`
static SPACED_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").expect("spaced range pattern"));

/// 无法确定类型的片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseAmbiguity {
    /// 在 token 序列中的位置
    pub index: usize,
    pub text: String,
}

/// 反向解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedExpression {
    pub tokens: Vec<Token>,
    pub ambiguities: Vec<ParseAmbiguity>,
}

impl ParsedExpression {
    pub fn is_clean(&self) -> bool {
        self.ambiguities.is_empty()
    }
}

/// 反向解析器
pub struct ReverseParser<'a> {
    catalog: &'a LexicalCatalog,
}

impl<'a> ReverseParser<'a> {
    pub fn new(catalog: &'a LexicalCatalog) -> Self {
        Self { catalog }
    }

    pub fn parse(&self, expression: &str) -> ParsedExpression {
        let words = split_words(expression);
        let scanned = self.scan(&words);
        let reclassified = self.reclassify(scanned);
        let tokens = self.mark_unknown(reclassified);

        let ambiguities: Vec<ParseAmbiguity> = tokens
            .iter()
            .enumerate()
            .filter_map(|(index, token)| match token {
                Token::Unknown { text } => Some(ParseAmbiguity {
                    index,
                    text: text.clone(),
                }),
                _ => None,
            })
            .collect();

        if ambiguities.is_empty() {
            debug!(tokens = tokens.len(), "表达式解析完成");
        } else {
            warn!(
                tokens = tokens.len(),
                ambiguities = ambiguities.len(),
                expression,
                "表达式解析存在无法识别的片段"
            );
        }

        ParsedExpression {
            tokens,
            ambiguities,
        }
    }

    /// 逐词扫描，得到初步分类的 token
    fn scan(&self, words: &[String]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < words.len() {
            if let Some((len, value)) = self.match_catalog_factor(&tokens, &words[i..]) {
                tokens.push(Token::factor(value));
                i += len;
                continue;
            }

            match words[i].as_str() {
                "(" => {
                    tokens.push(Token::OpenParen);
                    i += 1;
                    continue;
                }
                ")" => {
                    tokens.push(Token::CloseParen);
                    i += 1;
                    continue;
                }
                _ => {}
            }

            if let Some((len, phrase)) = self.catalog.match_phrase(&words[i..]) {
                tokens.push(match phrase {
                    Phrase::Operator(symbol) => Token::operator(symbol.clone()),
                    Phrase::Logical(symbol) => Token::logical(symbol),
                });
                i += len;
                continue;
            }

            let end = self.run_end(words, i);
            let run = &words[i..end];

            if let Some((len, param)) = self.catalog.match_parameter(run) {
                tokens.push(Token::parameter(param.name.clone(), param.id));
                i += len;
                continue;
            }

            self.push_factor_run(&mut tokens, &run.join(" "));
            i = end;
        }

        tokens
    }

    /// 片段终点：从 `start` 之后第一个边界单词的位置
    fn run_end(&self, words: &[String], start: usize) -> usize {
        (start + 1..words.len())
            .find(|&j| self.is_boundary(words, j))
            .unwrap_or(words.len())
    }

    fn is_boundary(&self, words: &[String], index: usize) -> bool {
        matches!(words[index].as_str(), "(" | ")")
            || self.catalog.match_phrase(&words[index..]).is_some()
    }

    /// 紧跟在“参数 操作符”之后时，按该参数的目录取值做最长匹配
    ///
    /// 目录取值可能包含括号、AND / OR 或操作符短语，必须先于其他规则整体识别。
    /// 区间同时匹配 `A-B` 与 `A - B` 两种写法，结果统一为 `A-B`。
    fn match_catalog_factor(
        &self,
        tokens: &[Token],
        words: &[String],
    ) -> Option<(usize, String)> {
        let [.., param, Token::Operator { .. }] = tokens else {
            return None;
        };
        if !param.is_parameter() {
            return None;
        }

        Grammar::new(self.catalog)
            .factors_of(param)
            .iter()
            .flat_map(|factor| {
                let canonical = factor.canonical_value();
                [split_words(&canonical), split_words(&factor.spaced_value())]
                    .map(|form| (form, canonical.clone()))
            })
            .filter(|(form, _)| !form.is_empty() && words.starts_with(form))
            .max_by_key(|(form, _)| form.len())
            .map(|(form, canonical)| (form.len(), canonical))
    }

    /// 取值片段：整体命中所属参数的目录取值时保持完整，否则按夹带的逻辑操作符拆分
    fn push_factor_run(&self, tokens: &mut Vec<Token>, run: &str) {
        let grammar = Grammar::new(self.catalog);
        let value = normalize_factor(run);
        let known = grammar
            .governing_parameter(tokens)
            .and_then(|param| grammar.parameter_id(param))
            .and_then(|id| self.catalog.find_factor(id, &value))
            .is_some();

        if known {
            tokens.push(Token::factor(value));
            return;
        }

        let mut last = 0;
        for m in EMBEDDED_LOGICAL.find_iter(run) {
            push_factor_part(tokens, &run[last..m.start()]);
            tokens.push(Token::logical(m.as_str()));
            last = m.end();
        }
        push_factor_part(tokens, &run[last..]);
    }

    /// 操作符前必须是参数、操作符后必须是取值，据此修正分类，再合并相邻取值
    fn reclassify(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for k in 0..tokens.len() {
            if !matches!(tokens[k], Token::Operator { .. }) {
                continue;
            }

            let before = match k.checked_sub(1).map(|i| &tokens[i]) {
                Some(Token::Factor { value }) => Some(self.as_parameter(value)),
                _ => None,
            };
            if let Some(param) = before {
                tokens[k - 1] = param;
            }

            let after = match tokens.get(k + 1) {
                Some(Token::Parameter { name, .. }) => Some(Token::factor(name.clone())),
                _ => None,
            };
            if let Some(factor) = after {
                tokens[k + 1] = factor;
            }
        }

        let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let (Some(Token::Factor { value: prev }), Token::Factor { value }) =
                (merged.last_mut(), &token)
            {
                prev.push(' ');
                prev.push_str(value);
                continue;
            }
            merged.push(token);
        }
        merged
    }

    fn as_parameter(&self, text: &str) -> Token {
        match self.catalog.find_parameter(text) {
            Some(param) => Token::parameter(param.name.clone(), param.id),
            None => Token::Parameter {
                name: text.to_string(),
                id: None,
            },
        }
    }

    /// 不符合语法的 token 替换为 Unknown
    fn mark_unknown(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for index in Grammar::new(self.catalog).violations(&tokens) {
            let text = tokens[index].display_text().to_string();
            tokens[index] = Token::Unknown { text };
        }
        tokens
    }
}

/// 括号两侧补空格后按空白切分
fn split_words(display: &str) -> Vec<String> {
    display
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn push_factor_part(tokens: &mut Vec<Token>, part: &str) {
    let part = part.trim();
    if !part.is_empty() {
        tokens.push(Token::factor(normalize_factor(part)));
    }
}

/// 折叠空白，并把 `A - B` 规范为 `A-B`
pub(crate) fn normalize_factor(text: &str) -> String {
    let collapsed = crate::catalog::normalize_whitespace(text);
    SPACED_RANGE.replace(&collapsed, "$1-$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactorDef, ParameterDef};
    use crate::token::TokenKind;
    use std::collections::HashMap;

    fn catalog() -> LexicalCatalog {
        let mut factors = HashMap::new();
        factors.insert(5, vec![FactorDef::single("18"), FactorDef::single("21")]);
        factors.insert(
            7,
            vec![
                FactorDef::range("20", "30"),
                FactorDef::single("Gold,OR,Silver"),
                FactorDef::single("Gold OR Silver"),
                FactorDef::single("Tier (1)"),
            ],
        );
        LexicalCatalog::new(
            vec![
                ParameterDef::new(5, "Age"),
                ParameterDef::new(7, "Salary"),
                ParameterDef::new(9, "Loan Amount"),
                ParameterDef::new(11, "Loan"),
                ParameterDef::new(12, "City"),
            ],
            factors,
            ["=", ">", "In List", "Not In List", "Range"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn parse(display: &str) -> ParsedExpression {
        let catalog = catalog();
        ReverseParser::new(&catalog).parse(display)
    }

    #[test]
    fn test_multi_word_parameter() {
        let parsed = parse("Loan Amount > 1000");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::parameter("Loan Amount", 9),
                Token::operator(">"),
                Token::factor("1000"),
            ]
        );
    }

    #[test]
    fn test_incomplete_legacy_expression() {
        let parsed = parse("Age In List");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![Token::parameter("Age", 5), Token::operator("In List")]
        );
    }

    #[test]
    fn test_nested_expression_with_range() {
        let parsed = parse("(Age > 18 AND Salary Not In List 20-30)");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::OpenParen,
                Token::parameter("Age", 5),
                Token::operator(">"),
                Token::factor("18"),
                Token::and(),
                Token::parameter("Salary", 7),
                Token::operator("Not In List"),
                Token::factor("20-30"),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_case_insensitive_matching_returns_canonical_names() {
        let parsed = parse("loan amount in list 5 or age = 21");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::parameter("Loan Amount", 9),
                Token::operator("In List"),
                Token::factor("5"),
                Token::or(),
                Token::parameter("Age", 5),
                Token::operator("="),
                Token::factor("21"),
            ]
        );
    }

    #[test]
    fn test_spaced_range_is_normalized() {
        let parsed = parse("Salary Range 20 - 30");
        assert_eq!(parsed.tokens[2], Token::factor("20-30"));
    }

    #[test]
    fn test_multi_word_factor_value() {
        let parsed = parse("City = New York");
        assert_eq!(parsed.tokens[2], Token::factor("New York"));
    }

    #[test]
    fn test_factor_matching_parameter_name_is_reclassified() {
        let parsed = parse("City = Loan Town");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::parameter("City", 12),
                Token::operator("="),
                Token::factor("Loan Town"),
            ]
        );
    }

    #[test]
    fn test_unknown_parameter_before_operator() {
        let parsed = parse("Credit Score > 700");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens[0],
            Token::Parameter {
                name: "Credit Score".to_string(),
                id: None,
            }
        );
        assert_eq!(parsed.tokens[2], Token::factor("700"));
    }

    #[test]
    fn test_embedded_logical_operator_in_factor_run() {
        let parsed = parse("City = Paris,AND,Rome");
        assert_eq!(
            parsed.tokens.iter().map(Token::kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Parameter,
                TokenKind::Operator,
                TokenKind::Factor,
                TokenKind::LogicalOperator,
                TokenKind::Unknown,
            ]
        );
        assert_eq!(parsed.tokens[2], Token::factor("Paris,"));
        assert_eq!(parsed.ambiguities[0].index, 4);
    }

    #[test]
    fn test_known_factor_is_not_split() {
        let parsed = parse("Salary In List gold,or,silver");
        assert!(parsed.is_clean());
        assert_eq!(parsed.tokens.len(), 3);
        assert_eq!(parsed.tokens[2], Token::factor("gold,or,silver"));
    }

    #[test]
    fn test_catalog_factor_with_logical_word_is_kept_whole() {
        let parsed = parse("Salary In List Gold OR Silver AND Age > 18");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::parameter("Salary", 7),
                Token::operator("In List"),
                Token::factor("Gold OR Silver"),
                Token::and(),
                Token::parameter("Age", 5),
                Token::operator(">"),
                Token::factor("18"),
            ]
        );
    }

    #[test]
    fn test_catalog_factor_with_parentheses() {
        let parsed = parse("( Salary = Tier (1) )");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.tokens,
            vec![
                Token::OpenParen,
                Token::parameter("Salary", 7),
                Token::operator("="),
                Token::factor("Tier (1)"),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_catalog_factor_of_other_parameter_is_not_matched() {
        // Age 没有 "Gold OR Silver" 这个取值，仍按逻辑操作符拆分
        let parsed = parse("Age = Gold OR Silver");
        assert_eq!(parsed.tokens[2], Token::factor("Gold"));
        assert_eq!(parsed.tokens[3], Token::or());
        assert!(!parsed.is_clean());
    }

    #[test]
    fn test_stray_close_paren_becomes_unknown() {
        let parsed = parse("Age > 18 )");
        assert_eq!(parsed.tokens.len(), 4);
        assert_eq!(
            parsed.ambiguities,
            vec![ParseAmbiguity {
                index: 3,
                text: ")".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(parse("").tokens.is_empty());
        assert!(parse("   ").tokens.is_empty());
    }

    #[test]
    fn test_normalize_factor() {
        assert_eq!(normalize_factor("  20   -  30 "), "20-30");
        assert_eq!(normalize_factor("New   York"), "New York");
        assert_eq!(normalize_factor("2020-01-05"), "2020-01-05");
    }
}
