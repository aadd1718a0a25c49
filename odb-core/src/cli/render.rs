//! Resolves `{<sym_id>}` placeholders inside rendered code text with one
//! batched `get_syms_by_ids` call per window, rather than one round-trip per
//! operand.

use crate::client::{Backend, ClientFacade};
use crate::types::SymId;
use crate::Result;

/// Finds every `{<digits>}` placeholder in `text`, looks its symbol name up
/// in one batched call, and substitutes it in place. Placeholders with no
/// matching symbol are left untouched.
pub fn substitute_symbols<B: Backend>(client: &mut ClientFacade<B>, texts: &[String]) -> Result<Vec<String>> {
    let mut ids: Vec<SymId> = Vec::new();
    for text in texts {
        ids.extend(placeholders(text));
    }
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(texts.to_vec());
    }

    let infos = client.get_syms_by_ids(&ids)?;
    let names: std::collections::HashMap<SymId, &str> =
        infos.iter().map(|i| (i.id, i.name.as_str())).collect();

    Ok(texts
        .iter()
        .map(|text| replace_placeholders(text, &names))
        .collect())
}

fn placeholders(text: &str) -> Vec<SymId> {
    let mut ids = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        if let Some(end) = after.find('}') {
            if let Ok(id) = after[..end].parse::<SymId>() {
                ids.push(id);
            }
            rest = &after[end + 1..];
        } else {
            break;
        }
    }
    ids
}

fn replace_placeholders(text: &str, names: &std::collections::HashMap<SymId, &str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let body = &after[..end];
                match body.parse::<SymId>().ok().and_then(|id| names.get(&id)) {
                    Some(name) => out.push_str(name),
                    None => {
                        out.push('{');
                        out.push_str(body);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_all_placeholders_in_a_window() {
        let ids = placeholders("call {3} ; jmp {7} if {3}");
        assert_eq!(ids, vec![3, 7, 3]);
    }

    #[test]
    fn replaces_known_and_leaves_unknown() {
        let mut names = std::collections::HashMap::new();
        names.insert(3u32, "my_add");
        let out = replace_placeholders("call {3}, skip {9}", &names);
        assert_eq!(out, "call my_add, skip {9}");
    }
}
