//! Selector subset used to locate widget elements and drive the page.
//!
//! Supported: groups (`a, b`), descendant and child (`>`) combinators, tag or
//! `*`, `#id`, `.class` and `[attr]` / `[attr=value]`. A backslash escapes the
//! next character, so Tailwind-style classes such as `.text-\[\#BA4040\]` can
//! be written.

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

impl SelectorAttrCondition {
    pub(crate) fn key(&self) -> &str {
        match self {
            Self::Exists { key } | Self::Eq { key, .. } => key,
        }
    }

    pub(crate) fn matches(&self, actual: Option<&str>) -> bool {
        match self {
            Self::Exists { .. } => actual.is_some(),
            Self::Eq { value, .. } => actual == Some(value.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
}

impl SelectorStep {
    pub(crate) fn id_only(&self) -> Option<&str> {
        if !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && !self.universal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    pub(crate) combinator: Option<SelectorCombinator>,
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let groups = split_top_level(selector, |ch| ch == ',', false)?;
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        let group = group.trim();
        if group.is_empty() {
            return Err(Error::UnsupportedSelector(selector.into()));
        }
        parsed.push(parse_selector_chain(group)?);
    }
    Ok(parsed)
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let tokens = tokenize_selector(selector)?;
    let mut steps = Vec::new();
    let mut pending_child = false;

    for token in tokens {
        if token == ">" {
            if pending_child || steps.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_child = true;
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else if std::mem::take(&mut pending_child) {
            Some(SelectorCombinator::Child)
        } else {
            Some(SelectorCombinator::Descendant)
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending_child {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(steps)
}

/// Splits on `is_sep` outside brackets and escapes. With `keep_sep` the
/// separator becomes its own piece.
fn split_top_level(
    selector: &str,
    is_sep: impl Fn(char) -> bool,
    keep_sep: bool,
) -> Result<Vec<String>> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut chars = selector.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                let Some(escaped) = chars.next() else {
                    return Err(Error::UnsupportedSelector(selector.into()));
                };
                current.push(escaped);
            }
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            ch if bracket_depth == 0 && is_sep(ch) => {
                pieces.push(std::mem::take(&mut current));
                if keep_sep {
                    pieces.push(ch.to_string());
                }
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    pieces.push(current);
    Ok(pieces)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let pieces = split_top_level(selector, |ch| ch == '>' || ch.is_ascii_whitespace(), true)?;
    Ok(pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .collect())
}

fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let chars = part.chars().collect::<Vec<_>>();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if step.universal || step.tag.is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (id, next) = parse_selector_ident(&chars, i + 1)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            '.' => {
                let (class_name, next) = parse_selector_ident(&chars, i + 1)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                step.classes.push(class_name);
                i = next;
            }
            '[' => {
                let (attr, next) = parse_selector_attr_condition(part, &chars, i)?;
                step.attrs.push(attr);
                i = next;
            }
            _ => {
                if !step.is_empty() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let (tag, next) = parse_selector_ident(&chars, i)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    if step.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }
    Ok(step)
}

fn parse_selector_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                out.push(*chars.get(i + 1)?);
                i += 2;
            }
            '#' | '.' | '[' | ']' | '*' | '=' | '\'' | '"' => break,
            ch if ch.is_whitespace() => break,
            ch => {
                out.push(ch);
                i += 1;
            }
        }
    }
    if out.is_empty() { None } else { Some((out, i)) }
}

fn parse_selector_attr_condition(
    part: &str,
    chars: &[char],
    open: usize,
) -> Result<(SelectorAttrCondition, usize)> {
    let unsupported = || Error::UnsupportedSelector(part.into());
    let (key, mut i) = parse_selector_ident(chars, open + 1).ok_or_else(unsupported)?;
    let key = key.to_ascii_lowercase();

    match chars.get(i) {
        Some(']') => Ok((SelectorAttrCondition::Exists { key }, i + 1)),
        Some('=') => {
            i += 1;
            let value = match chars.get(i) {
                Some(quote @ ('\'' | '"')) => {
                    let quote = *quote;
                    let start = i + 1;
                    let end = chars[start..]
                        .iter()
                        .position(|ch| *ch == quote)
                        .map(|offset| start + offset)
                        .ok_or_else(unsupported)?;
                    i = end + 1;
                    chars[start..end].iter().collect::<String>()
                }
                _ => {
                    let (value, next) = parse_selector_ident(chars, i).ok_or_else(unsupported)?;
                    i = next;
                    value
                }
            };
            if chars.get(i) != Some(&']') {
                return Err(unsupported());
            }
            Ok((SelectorAttrCondition::Eq { key, value }, i + 1))
        }
        _ => Err(unsupported()),
    }
}
