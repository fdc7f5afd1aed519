//! Recursive-descent parser for the filter language
//!
//! ```text
//! filter   := kinds [ "with" expr ] | [ "with" ] expr
//! kinds    := kind { "," kind }            kind := nodes | ways | relations
//! expr     := and { "or" and }
//! and      := operand { "and" operand }
//! operand  := "(" expr ")" | "!" "(" expr ")" | tag
//! ```
//!
//! Every operand must be separated from the keywords around it by whitespace or a
//! bracket. Positions in errors are 0-based character columns.

use super::date::{DateFilter, DateUnit, MAX_RELATIVE_DAYS};
use super::expression::Expression;
use super::tag_filter::{Comparison, Pattern, TagFilter};
use super::ElementFilterExpression;
use crate::check_date::parse_check_date;
use crate::element::ElementType;
use crate::error::{QuestError, Result};

const KEYWORD_WITH: &str = "with";
const KEYWORD_AND: &str = "and";
const KEYWORD_OR: &str = "or";
const OLDER: &str = "older";
const NEWER: &str = "newer";
const TODAY: &str = "today";

const RESERVED_WORDS: [&str; 3] = [KEYWORD_WITH, KEYWORD_AND, KEYWORD_OR];
const QUOTATION_MARKS: [char; 2] = ['"', '\''];

/// Must be tried in this order so that `>=` is not read as `>`
const SYMBOL_OPERATORS: [&str; 8] = [">=", "<=", ">", "<", "!=", "=", "!~", "~"];

const KINDS: [(&str, ElementType); 3] = [
    ("nodes", ElementType::Node),
    ("ways", ElementType::Way),
    ("relations", ElementType::Relation),
];

pub(super) fn parse(source: &str) -> Result<ElementFilterExpression> {
    let mut parser = Parser::new(source);
    parser.skip_spaces();

    let kinds = parser.parse_kinds()?;
    parser.skip_spaces();

    let root = match kinds {
        Some(_) if parser.is_at_end() => None,
        Some(_) => {
            if !parser.advance_if_word(KEYWORD_WITH) {
                return Err(parser.error("Expected end of string or 'with' keyword"));
            }
            Some(parser.parse_root()?)
        }
        None => {
            if parser.advance_if_word(KEYWORD_WITH) {
                Some(parser.parse_root()?)
            } else if parser.is_at_end() {
                return Err(parser.error("Expected element types or a tag filter"));
            } else {
                let expr = parser.parse_or()?;
                Some(parser.finish(expr)?)
            }
        }
    };

    Ok(ElementFilterExpression::new(kinds.unwrap_or_default(), root))
}

enum Operator {
    Symbol(&'static str),
    Older,
    Newer,
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let chars = source
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        Self {
            source,
            chars,
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> QuestError {
        self.error_at(message, self.pos)
    }

    fn error_at(&self, message: impl Into<String>, position: usize) -> QuestError {
        QuestError::filter_parse(message, position, self.source)
    }

    // ---- cursor primitives ----

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn previous_is(&self, c: char) -> bool {
        self.pos > 0 && self.chars.get(self.pos - 1) == Some(&c)
    }

    fn next_is(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn next_is_ignore_case(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            match self.chars.get(i) {
                Some(found) if found.eq_ignore_ascii_case(&c) => i += 1,
                _ => return false,
            }
        }
        true
    }

    fn advance_if(&mut self, s: &str) -> bool {
        if self.next_is(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn advance_if_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn advance_by(&mut self, n: usize) -> String {
        let end = (self.pos + n).min(self.chars.len());
        let result: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        result
    }

    fn skip_spaces(&mut self) -> usize {
        let mut count = 0;
        while self.advance_if_char(' ') {
            count += 1;
        }
        count
    }

    fn expect_spaces(&mut self) -> Result<usize> {
        let count = self.skip_spaces();
        if count == 0 {
            return Err(self.error("Expected a whitespace"));
        }
        Ok(count)
    }

    /// Distance to the first char matching `stop`, or to the end
    fn find_next(&self, offset: usize, stop: impl Fn(char) -> bool) -> usize {
        self.chars[(self.pos + offset).min(self.chars.len())..]
            .iter()
            .position(|c| stop(*c))
            .map(|p| p + offset)
            .unwrap_or(self.chars.len().saturating_sub(self.pos))
    }

    /// Whether `word` follows, terminated by one of `terminators` or the end
    fn word_follows(&self, word: &str, terminators: &[char]) -> bool {
        self.next_is(word)
            && self
                .peek_at(word.chars().count())
                .is_none_or(|c| terminators.contains(&c))
    }

    fn advance_if_word(&mut self, word: &str) -> bool {
        if self.word_follows(word, &[' ', '(']) {
            self.pos += word.chars().count();
            true
        } else {
            false
        }
    }

    // ---- element kinds ----

    fn kind_follows(&self) -> Option<(&'static str, ElementType)> {
        KINDS
            .iter()
            .find(|(name, _)| self.word_follows(name, &[' ', ',']))
            .copied()
    }

    fn parse_kinds(&mut self) -> Result<Option<Vec<ElementType>>> {
        let Some(first) = self.kind_follows() else {
            return Ok(None);
        };
        self.pos += first.0.len();
        let mut kinds = vec![first.1];

        loop {
            self.skip_spaces();
            if !self.advance_if_char(',') {
                break;
            }
            self.skip_spaces();
            let Some((name, kind)) = self.kind_follows() else {
                return Err(self.error(
                    "Expected element types. Any of: nodes, ways or relations, separated by ','",
                ));
            };
            if kinds.contains(&kind) {
                return Err(self.error(format!("Mentioned the same element type {} twice", name)));
            }
            self.pos += name.len();
            kinds.push(kind);
        }
        Ok(Some(kinds))
    }

    // ---- boolean structure ----

    fn parse_root(&mut self) -> Result<Expression> {
        if !matches!(self.peek(), Some(' ') | Some('(')) {
            return Err(self.error("Expected a whitespace or bracket before the tag"));
        }
        let expr = self.parse_or()?;
        self.finish(expr)
    }

    /// Accept `expr` only if nothing but whitespace follows it
    fn finish(&mut self, expr: Expression) -> Result<Expression> {
        self.skip_spaces();
        match self.peek() {
            None => Ok(expr),
            Some(')') => Err(self.error("Found a closing bracket without matching opening bracket")),
            Some(_) => Err(self.error("Expected end of string, 'and' or 'or'")),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<bool> {
        let save = self.pos;
        self.skip_spaces();
        if !self.word_follows(keyword, &[' ', '(', '!']) {
            self.pos = save;
            return Ok(false);
        }
        self.pos += keyword.len();
        if !matches!(self.peek(), Some(' ') | Some('(')) {
            return Err(self.error("Expected a whitespace or bracket before the tag"));
        }
        Ok(true)
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut children = vec![self.parse_and()?];
        while self.keyword(KEYWORD_OR)? {
            children.push(self.parse_and()?);
        }
        Ok(Expression::or(children))
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut children = vec![self.parse_operand()?];
        while self.keyword(KEYWORD_AND)? {
            children.push(self.parse_operand()?);
        }
        Ok(Expression::and(children))
    }

    fn negated_group_follows(&self) -> bool {
        if self.peek() != Some('!') {
            return false;
        }
        let mut i = self.pos + 1;
        while self.chars.get(i) == Some(&' ') {
            i += 1;
        }
        self.chars.get(i) == Some(&'(')
    }

    fn parse_group(&mut self) -> Result<Expression> {
        let open = self.pos - 1;
        let inner = self.parse_or()?;
        self.skip_spaces();
        if !self.advance_if_char(')') {
            if self.is_at_end() {
                return Err(self.error_at("Missing closing bracket", open));
            }
            return Err(self.error("Expected a closing bracket, 'and' or 'or'"));
        }
        Ok(inner)
    }

    fn parse_operand(&mut self) -> Result<Expression> {
        self.skip_spaces();
        let expr = if self.advance_if_char('(') {
            self.parse_group()?
        } else if self.negated_group_follows() {
            self.pos += 1;
            self.skip_spaces();
            self.advance_if_char('(');
            Expression::not(self.parse_group()?)
        } else {
            Expression::Leaf(self.parse_tag()?)
        };

        let separated = self.is_at_end()
            || matches!(self.peek(), Some(' ') | Some(')'))
            || self.previous_is(' ')
            || self.previous_is(')');
        if !separated {
            return Err(self.error("Expected a whitespace or bracket after the tag"));
        }
        Ok(expr)
    }

    // ---- predicates ----

    fn parse_tag(&mut self) -> Result<TagFilter> {
        if self.advance_if_char('!') {
            self.skip_spaces();
            if self.advance_if_char('~') {
                let key = self.parse_pattern(Self::parse_key)?;
                return Ok(TagFilter::NotHasKeyLike { key });
            }
            return Ok(TagFilter::NotHasKey {
                key: self.parse_key()?,
            });
        }

        if self.advance_if_char('~') {
            self.skip_spaces();
            let key = self.parse_pattern(Self::parse_key)?;
            self.skip_spaces();
            let op_pos = self.pos;
            return match self.parse_operator() {
                None => Ok(TagFilter::HasKeyLike { key }),
                Some(Operator::Symbol("~")) => {
                    self.skip_spaces();
                    let value = self.parse_pattern(Self::parse_quotable_word)?;
                    Ok(TagFilter::HasTagLike { key, value })
                }
                Some(_) => Err(self.error_at(
                    "The key prefix operator '~' must be used together with the binary operator '~'",
                    op_pos,
                )),
            };
        }

        if self.word_follows(OLDER, &[' ']) {
            self.pos += OLDER.len();
            self.expect_spaces()?;
            return Ok(TagFilter::ElementOlderThan {
                date: self.parse_date()?,
            });
        }
        if self.word_follows(NEWER, &[' ']) {
            self.pos += NEWER.len();
            self.expect_spaces()?;
            return Ok(TagFilter::ElementNewerThan {
                date: self.parse_date()?,
            });
        }

        let key = self.parse_key()?;
        self.skip_spaces();
        let Some(operator) = self.parse_operator() else {
            return Ok(TagFilter::HasKey { key });
        };

        match operator {
            Operator::Older => {
                self.expect_spaces()?;
                Ok(TagFilter::TagOlderThan {
                    key,
                    date: self.parse_date()?,
                })
            }
            Operator::Newer => {
                self.expect_spaces()?;
                Ok(TagFilter::TagNewerThan {
                    key,
                    date: self.parse_date()?,
                })
            }
            Operator::Symbol(symbol) => {
                self.skip_spaces();
                self.parse_binary(key, symbol)
            }
        }
    }

    fn parse_binary(&mut self, key: String, symbol: &str) -> Result<TagFilter> {
        let comparison = match symbol {
            "=" => {
                let value = self.parse_quotable_word()?;
                return Ok(TagFilter::HasTag { key, value });
            }
            "!=" => {
                let value = self.parse_quotable_word()?;
                return Ok(TagFilter::NotHasTag { key, value });
            }
            "~" => {
                let value = self.parse_pattern(Self::parse_quotable_word)?;
                return Ok(TagFilter::HasTagValueLike { key, value });
            }
            "!~" => {
                let value = self.parse_pattern(Self::parse_quotable_word)?;
                return Ok(TagFilter::NotHasTagValueLike { key, value });
            }
            ">" => Comparison::Greater,
            ">=" => Comparison::GreaterOrEqual,
            "<" => Comparison::Less,
            "<=" => Comparison::LessOrEqual,
            other => return Err(self.error(format!("Unknown operator '{}'", other))),
        };

        if self.number_follows() {
            let value = self.parse_number()?;
            Ok(TagFilter::HasTagNumber {
                key,
                op: comparison,
                value,
            })
        } else {
            let date = self.parse_date()?;
            Ok(TagFilter::HasDateTag {
                key,
                op: comparison,
                date,
            })
        }
    }

    fn parse_operator(&mut self) -> Option<Operator> {
        for symbol in SYMBOL_OPERATORS {
            if self.advance_if(symbol) {
                return Some(Operator::Symbol(symbol));
            }
        }
        if self.word_follows(OLDER, &[' ']) {
            self.pos += OLDER.len();
            return Some(Operator::Older);
        }
        if self.word_follows(NEWER, &[' ']) {
            self.pos += NEWER.len();
            return Some(Operator::Newer);
        }
        None
    }

    fn reserved_word_follows(&self) -> Option<&'static str> {
        RESERVED_WORDS.iter().copied().find(|w| {
            self.next_is_ignore_case(w)
                && self
                    .peek_at(w.len())
                    .is_none_or(|c| c == ' ' || c == '(')
        })
    }

    /// Length of a quoted token including both quotation marks
    fn quotation_length(&self) -> Result<Option<usize>> {
        let Some(quote) = self.peek().filter(|c| QUOTATION_MARKS.contains(c)) else {
            return Ok(None);
        };
        let length = self.find_next(1, |c| c == quote);
        if self.pos + length >= self.chars.len() {
            return Err(self.error("Did not close quotation marks"));
        }
        Ok(Some(length + 1))
    }

    fn word_length(&self) -> usize {
        self.find_next(0, |c| c == ' ' || c == ')')
    }

    fn take_quoted(&mut self, length: usize) -> String {
        let raw = self.advance_by(length);
        let mut chars = raw.chars();
        chars.next();
        chars.next_back();
        chars.collect()
    }

    fn parse_key(&mut self) -> Result<String> {
        if let Some(word) = self.reserved_word_follows() {
            return Err(self.error(format!(
                "A key cannot be named like the reserved word '{}', surround it with quotation marks",
                word
            )));
        }
        if let Some(length) = self.quotation_length()? {
            return Ok(self.take_quoted(length));
        }
        let length =
            self.find_next(0, |c| matches!(c, ' ' | ')' | '(' | '=' | '~' | '<' | '>' | '!'));
        if length == 0 {
            return Err(self.error("Missing key (dangling prefix operator)"));
        }
        Ok(self.advance_by(length))
    }

    fn parse_quotable_word(&mut self) -> Result<String> {
        if let Some(length) = self.quotation_length()? {
            return Ok(self.take_quoted(length));
        }
        let length = self.word_length();
        if length == 0 {
            return Err(self.error("Missing value (dangling operator)"));
        }
        Ok(self.advance_by(length))
    }

    fn parse_pattern(&mut self, read: fn(&mut Self) -> Result<String>) -> Result<Pattern> {
        let start = self.pos;
        let source = read(self)?;
        Pattern::new(&source)
            .map_err(|e| self.error_at(format!("Invalid regular expression: {}", e), start))
    }

    fn number_follows(&self) -> bool {
        let word: String = self.chars[self.pos..self.pos + self.word_length()]
            .iter()
            .collect();
        is_number_word(&word)
    }

    fn parse_number(&mut self) -> Result<f64> {
        let start = self.pos;
        let length = self.word_length();
        if length == 0 {
            return Err(self.error("Missing value (dangling operator)"));
        }
        let word = self.advance_by(length);
        if !is_number_word(&word) {
            return Err(self.error_at("Expected a number", start));
        }
        word.parse::<f64>()
            .map_err(|_| self.error_at("Expected a number", start))
    }

    fn parse_date(&mut self) -> Result<DateFilter> {
        let start = self.pos;
        let length = self.word_length();
        if length == 0 {
            return Err(self.error("Missing date"));
        }
        let word = self.advance_by(length);
        if word == TODAY {
            return self.parse_today_offset();
        }
        match parse_check_date(&word) {
            Some(date) => Ok(DateFilter::Fixed(date)),
            None => Err(self.error_at("Expected either a date (YYYY-MM-DD) or 'today'", start)),
        }
    }

    fn parse_today_offset(&mut self) -> Result<DateFilter> {
        let save = self.pos;
        self.skip_spaces();
        let sign = if self.advance_if_char('+') {
            1.0
        } else if self.advance_if_char('-') {
            -1.0
        } else {
            self.pos = save;
            return Ok(DateFilter::today());
        };
        self.skip_spaces();
        let amount_start = self.pos;
        let amount = self.parse_number()?;
        self.expect_spaces()?;
        for unit in [
            DateUnit::Years,
            DateUnit::Months,
            DateUnit::Weeks,
            DateUnit::Days,
        ] {
            if self.advance_if(unit.as_str()) {
                if amount * unit.in_days() > MAX_RELATIVE_DAYS {
                    return Err(self.error_at("Date offset out of range", amount_start));
                }
                return Ok(DateFilter::relative(sign * amount, unit));
            }
        }
        Err(self.error("Expected years, months, weeks or days"))
    }
}

fn is_number_word(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let mut parts = digits.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next();
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match frac {
        None => !int.is_empty() && all_digits(int),
        Some(frac) => {
            all_digits(int) && all_digits(frac) && !(int.is_empty() && frac.is_empty())
        }
    }
}
