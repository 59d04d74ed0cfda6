//! Minimal query-expression parser.
//!
//! §1 lists the query parser/tokenizer as an external collaborator, but
//! without *some* parser the C6 evaluator can't be driven from a query file
//! at all, so this module supplies the minimum structural parser needed:
//! `#AND`, `#OR`, `#SUM`, `#WAND w1 t1 w2 t2 …`, `#WSUM`, `#SYN`, `#NEAR/k`,
//! `#WINDOW/k`, and `word.field` qualifiers (§6). It does no linguistic
//! normalization — no stemming, no stopwording, no case folding — only
//! structural parsing of operator syntax and field qualifiers, which stays
//! inside spec.md's Non-goals ("stemming/tokenization policy").
//!
//! Grammar (informal):
//!   scoring   := '#' ('AND'|'OR'|'SUM') '(' scoring-child* ')'
//!              | '#' ('WAND'|'WSUM') '(' (weight scoring-child)* ')'
//!   sc-child  := scoring | term-expr                 (term-expr implicitly wrapped in Score)
//!   term-expr := '#' ('SYN'|'NEAR/' k |'WINDOW/' k) '(' term-expr* ')'
//!              | word ['.' field]
//!
//! A bare term with no `.field` qualifier defaults to field `body`.

use rank_retrieve::model::RetrievalModel;
use rank_retrieve::operators::positional::PositionalExpr;
use rank_retrieve::operators::scoring::ScoringExpr;

use crate::error::RunError;

const DEFAULT_FIELD: &str = "body";

fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if c == '(' || c == ')' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct TokenStream {
    tokens: Vec<String>,
    pos: usize,
}

impl TokenStream {
    fn new(tokens: Vec<String>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &str) -> Result<(), RunError> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            other => Err(RunError::ParameterMalformed(format!(
                "expected {expected:?}, got {other:?}"
            ))),
        }
    }
}

fn parse_term(token: &str) -> PositionalExpr {
    match token.rsplit_once('.') {
        Some((term, field)) if !field.is_empty() => {
            PositionalExpr::Term { field: field.to_string(), term: term.to_string() }
        }
        _ => PositionalExpr::Term { field: DEFAULT_FIELD.to_string(), term: token.to_string() },
    }
}

fn parse_positional(tokens: &mut TokenStream) -> Result<PositionalExpr, RunError> {
    let head = tokens.peek().ok_or_else(|| RunError::ParameterMalformed("unexpected end of query".into()))?;
    if !head.starts_with('#') {
        let token = tokens.next().unwrap();
        return Ok(parse_term(&token));
    }

    let op = tokens.next().unwrap();
    let (name, k) = split_op(&op)?;
    tokens.expect("(")?;
    let mut children = Vec::new();
    while tokens.peek() != Some(")") {
        children.push(parse_positional(tokens)?);
    }
    tokens.expect(")")?;

    match name.as_str() {
        "SYN" => Ok(PositionalExpr::Synonym(children)),
        "NEAR" => {
            let k = k.ok_or_else(|| RunError::ParameterMalformed("#NEAR requires a /k suffix".into()))?;
            Ok(PositionalExpr::OrderedNear { k, children })
        }
        "WINDOW" => {
            let k = k.ok_or_else(|| RunError::ParameterMalformed("#WINDOW requires a /k suffix".into()))?;
            Ok(PositionalExpr::UnorderedWindow { k, children })
        }
        other => Err(RunError::ParameterMalformed(format!("unsupported positional operator: #{other}"))),
    }
}

/// A scoring-operator child: a bare term or positional subexpression gets
/// implicitly wrapped in `Score`; a nested scoring operator is returned
/// as-is.
fn parse_scoring_child(tokens: &mut TokenStream) -> Result<ScoringExpr, RunError> {
    let head = tokens.peek().ok_or_else(|| RunError::ParameterMalformed("unexpected end of query".into()))?;
    if head.starts_with('#') {
        let (name, _) = peek_op_name(head)?;
        if matches!(name.as_str(), "AND" | "OR" | "SUM" | "WAND" | "WSUM") {
            return parse_scoring(tokens);
        }
    }
    Ok(ScoringExpr::Score(parse_positional(tokens)?))
}

fn peek_op_name(op: &str) -> Result<(String, Option<u32>), RunError> {
    split_op(op)
}

fn split_op(op: &str) -> Result<(String, Option<u32>), RunError> {
    let body = op.strip_prefix('#').ok_or_else(|| RunError::ParameterMalformed(format!("not an operator: {op:?}")))?;
    match body.split_once('/') {
        Some((name, k)) => {
            let k: u32 = k
                .parse()
                .map_err(|_| RunError::ParameterMalformed(format!("bad /k suffix on {op:?}")))?;
            Ok((name.to_ascii_uppercase(), Some(k)))
        }
        None => Ok((body.to_ascii_uppercase(), None)),
    }
}

fn parse_weight(tokens: &mut TokenStream) -> Result<f64, RunError> {
    let token = tokens.next().ok_or_else(|| RunError::ParameterMalformed("expected a weight".into()))?;
    token
        .parse()
        .map_err(|_| RunError::ParameterMalformed(format!("expected a numeric weight, got {token:?}")))
}

fn parse_scoring(tokens: &mut TokenStream) -> Result<ScoringExpr, RunError> {
    let op = tokens.next().ok_or_else(|| RunError::ParameterMalformed("unexpected end of query".into()))?;
    let (name, _) = split_op(&op)?;
    tokens.expect("(")?;

    let expr = match name.as_str() {
        "AND" => {
            let mut children = Vec::new();
            while tokens.peek() != Some(")") {
                children.push(parse_scoring_child(tokens)?);
            }
            ScoringExpr::And(children)
        }
        "OR" => {
            let mut children = Vec::new();
            while tokens.peek() != Some(")") {
                children.push(parse_scoring_child(tokens)?);
            }
            ScoringExpr::Or(children)
        }
        "SUM" => {
            let mut children = Vec::new();
            while tokens.peek() != Some(")") {
                children.push(parse_scoring_child(tokens)?);
            }
            ScoringExpr::Sum(children)
        }
        "WAND" => {
            let mut children = Vec::new();
            while tokens.peek() != Some(")") {
                let weight = parse_weight(tokens)?;
                let child = parse_scoring_child(tokens)?;
                children.push((weight, child));
            }
            ScoringExpr::WAnd(children)
        }
        "WSUM" => {
            let mut children = Vec::new();
            while tokens.peek() != Some(")") {
                let weight = parse_weight(tokens)?;
                let child = parse_scoring_child(tokens)?;
                children.push((weight, child));
            }
            ScoringExpr::WSum(children)
        }
        other => {
            return Err(RunError::ParameterMalformed(format!("unsupported scoring operator: #{other}")));
        }
    };
    tokens.expect(")")?;
    Ok(expr)
}

/// Parse a query expression already wrapped in its model's default operator
/// (§4.6 step 1). The caller is responsible for wrapping; this function
/// requires the text to begin with a scoring operator.
pub fn parse_scoring_expr(text: &str) -> Result<ScoringExpr, RunError> {
    let mut tokens = TokenStream::new(tokenize(text));
    let expr = parse_scoring(&mut tokens)?;
    if tokens.peek().is_some() {
        return Err(RunError::ParameterMalformed(format!(
            "trailing tokens after query expression: {text:?}"
        )));
    }
    Ok(expr)
}

/// §4.6 step 1: `qString := defaultOp + "(" + qString + ")"`, unconditionally
/// wrapping the entire original query text in the model's default operator.
pub fn wrap_in_default_op(query_text: &str, model: &RetrievalModel) -> String {
    format!("#{}({})", model.default_qry_sop_name(), query_text)
}

/// Wrap and parse a raw query-file expression into a root `ScoringExpr`,
/// i.e. the whole of §4.6 step 1 and step 2's parse (the "return empty if
/// root has zero children" half of step 2 is handled downstream by C6's
/// `process_query`, which already treats a zero-child root as an empty
/// result).
pub fn parse_query(query_text: &str, model: &RetrievalModel) -> Result<ScoringExpr, RunError> {
    parse_scoring_expr(&wrap_in_default_op(query_text, model))
}

/// Bare query terms with any `.field` qualifier stripped, for C10's feature
/// extractor, which scores a query against a fixed set of fields rather
/// than the query's own field qualifiers. Operator and weight tokens are
/// skipped; this is glue for the LTR path, not a second query parser.
pub fn extract_terms(query_text: &str) -> Vec<String> {
    tokenize(query_text)
        .into_iter()
        .filter(|t| t != "(" && t != ")" && !t.starts_with('#') && t.parse::<f64>().is_err())
        .map(|t| match t.rsplit_once('.') {
            Some((term, field)) if !field.is_empty() => term.to_string(),
            _ => t,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_wraps_in_default_op_for_bm25() {
        let model = RetrievalModel::bm25_default();
        let wrapped = wrap_in_default_op("dog.title cat.body", &model);
        assert_eq!(wrapped, "#sum(dog.title cat.body)");
        let expr = parse_query("dog.title cat.body", &model).unwrap();
        match expr {
            ScoringExpr::Sum(children) => assert_eq!(children.len(), 2),
            other => panic!("expected Sum, got {other:?}"),
        }
    }

    #[test]
    fn bare_term_defaults_to_body_field() {
        let model = RetrievalModel::bm25_default();
        let expr = parse_query("dog", &model).unwrap();
        match expr {
            ScoringExpr::Sum(children) => match &children[0] {
                ScoringExpr::Score(PositionalExpr::Term { field, term }) => {
                    assert_eq!(field, "body");
                    assert_eq!(term, "dog");
                }
                other => panic!("expected Score(Term), got {other:?}"),
            },
            other => panic!("expected Sum, got {other:?}"),
        }
    }

    #[test]
    fn nested_near_and_wand_parse() {
        let model = RetrievalModel::indri_default();
        let expr =
            parse_query("#WAND(2.0 #NEAR/2(dog.body fox.body) 1.0 cat.body)", &model).unwrap();
        match expr {
            ScoringExpr::And(children) => {
                assert_eq!(children.len(), 1);
                match &children[0] {
                    ScoringExpr::WAnd(pairs) => {
                        assert_eq!(pairs.len(), 2);
                        assert_eq!(pairs[0].0, 2.0);
                        match &pairs[0].1 {
                            ScoringExpr::Score(PositionalExpr::OrderedNear { k, children }) => {
                                assert_eq!(*k, 2);
                                assert_eq!(children.len(), 2);
                            }
                            other => panic!("expected Score(OrderedNear), got {other:?}"),
                        }
                    }
                    other => panic!("expected nested WAnd, got {other:?}"),
                }
            }
            other => panic!("expected outer And wrapper, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operator_is_a_parse_error() {
        let model = RetrievalModel::bm25_default();
        assert!(parse_query("#FOO(dog.body)", &model).is_err());
    }

    #[test]
    fn extract_terms_strips_operators_weights_and_fields() {
        let terms = extract_terms("#WAND(2.0 dog.title 1.0 cat.body)");
        assert_eq!(terms, vec!["dog".to_string(), "cat".to_string()]);
    }
}
