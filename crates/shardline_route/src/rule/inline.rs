//! Inline expressions for data nodes and table names.
//!
//! `ds_${0..1}.t_order_${0..1}` expands to the cartesian product of its
//! placeholders, leftmost placeholder varying slowest:
//! `ds_0.t_order_0, ds_0.t_order_1, ds_1.t_order_0, ds_1.t_order_1`.
//! Placeholders are inclusive integer ranges (`${0..3}`) or lists
//! (`${['a','b']}`, `${[a, b]}`). Top-level commas separate independent
//! expressions whose expansions are concatenated.

use shardline_common::ConfigError;

enum Segment {
    Literal(String),
    Choices(Vec<String>),
}

/// Expand an inline expression into concrete names, in order.
pub fn expand(expression: &str) -> Result<Vec<String>, ConfigError> {
    let mut result = Vec::new();
    for part in split_top_level(expression) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let segments = parse_segments(part).map_err(|reason| invalid(expression, reason))?;
        let mut expanded = vec![String::new()];
        for segment in segments {
            match segment {
                Segment::Literal(text) => {
                    for name in &mut expanded {
                        name.push_str(&text);
                    }
                }
                Segment::Choices(choices) => {
                    expanded = expanded
                        .iter()
                        .flat_map(|prefix| choices.iter().map(move |c| format!("{}{}", prefix, c)))
                        .collect();
                }
            }
        }
        result.extend(expanded);
    }
    if result.is_empty() {
        return Err(invalid(expression, "expression is empty".into()));
    }
    Ok(result)
}

fn invalid(expression: &str, reason: String) -> ConfigError {
    ConfigError::InvalidInlineExpression {
        expression: expression.to_string(),
        reason,
    }
}

fn split_top_level(expression: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in expression.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&expression[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&expression[start..]);
    parts
}

fn parse_segments(part: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = part;
    while let Some(open) = rest.find("${") {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or_else(|| "unclosed `${`".to_string())?;
        segments.push(Segment::Choices(parse_choices(&after[..close])?));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

fn parse_choices(body: &str) -> Result<Vec<String>, String> {
    let body = body.trim();
    if let Some(list) = body.strip_prefix('[').and_then(|b| b.strip_suffix(']')) {
        let items: Vec<String> = list
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return Err("empty list placeholder".into());
        }
        return Ok(items);
    }
    if let Some((lo, hi)) = body.split_once("..") {
        let lo: i64 = lo
            .trim()
            .parse()
            .map_err(|_| format!("invalid range start `{}`", lo.trim()))?;
        let hi: i64 = hi
            .trim()
            .parse()
            .map_err(|_| format!("invalid range end `{}`", hi.trim()))?;
        if lo > hi {
            return Err(format!("range {}..{} is descending", lo, hi));
        }
        return Ok((lo..=hi).map(|v| v.to_string()).collect());
    }
    Err(format!("unsupported placeholder `{}`", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_cartesian_leftmost_slowest() {
        let nodes = expand("ds_${0..1}.t_order_${0..1}").unwrap();
        assert_eq!(
            nodes,
            vec!["ds_0.t_order_0", "ds_0.t_order_1", "ds_1.t_order_0", "ds_1.t_order_1"]
        );
    }

    #[test]
    fn test_expand_list_and_comma_separated() {
        let nodes = expand("ds_${['a','b']}.t_user, ds_c.t_user_${[x, y]}").unwrap();
        assert_eq!(nodes, vec!["ds_a.t_user", "ds_b.t_user", "ds_c.t_user_x", "ds_c.t_user_y"]);
    }

    #[test]
    fn test_expand_plain_name() {
        assert_eq!(expand("ds_0.t_config").unwrap(), vec!["ds_0.t_config"]);
    }

    #[test]
    fn test_expand_rejects_malformed() {
        assert!(expand("ds_${0..1.t").is_err());
        assert!(expand("ds_${3..1}").is_err());
        assert!(expand("ds_${a..b}").is_err());
        assert!(expand("ds_${[]}").is_err());
        assert!(expand(" , ").is_err());
    }
}
