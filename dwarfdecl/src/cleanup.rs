//! Post-processing of generated headers.
//!
//! Compilers spell standard library types with every defaulted template
//! argument and with the library's inline namespace. This pass rewrites
//! those spellings to what a person would have typed, until nothing changes.

use anyhow::{Context, Result};
use regex::Regex;
use tracing::warn;

use crate::config::Replacement;

const MAX_PASSES: usize = 64;

/// Plain pattern rewrites applied on every pass.
const BUILTIN_REWRITES: &[(&str, &str)] = &[
    (r"std::__(?:1|ndk1)::", "std::"),
    (
        r"std::basic_string<char,\s*std::char_traits<char>\s*,\s*std::allocator<char>\s*>",
        "std::string",
    ),
    (
        r"std::basic_string_view<char,\s*std::char_traits<char>\s*>",
        "std::string_view",
    ),
    (
        r"std::chrono::time_point<std::chrono::steady_clock,\s*std::chrono::duration<long long,\s*std::ratio<1L?,\s*1000000000L?>\s*>\s*>",
        "std::chrono::steady_clock::time_point",
    ),
];

/// A standard template whose trailing arguments can be left out when they
/// equal the defaults derived from the leading ones.
struct DefaultedTemplate {
    name: &'static str,
    kept: usize,
    /// Accepted spellings of the defaulted arguments.
    defaults: fn(&[&str]) -> Vec<Vec<String>>,
}

fn allocator(ty: &str) -> String {
    format!("std::allocator<{ty}>")
}

fn pair_allocators(key: &str, value: &str) -> [String; 2] {
    [
        allocator(&format!("std::pair<const {key}, {value}>")),
        allocator(&format!("std::pair<{key} const, {value}>")),
    ]
}

const DEFAULTED_TEMPLATES: &[DefaultedTemplate] = &[
    DefaultedTemplate {
        name: "vector",
        kept: 1,
        defaults: |a| vec![vec![allocator(a[0])]],
    },
    DefaultedTemplate {
        name: "list",
        kept: 1,
        defaults: |a| vec![vec![allocator(a[0])]],
    },
    DefaultedTemplate {
        name: "deque",
        kept: 1,
        defaults: |a| vec![vec![allocator(a[0])]],
    },
    DefaultedTemplate {
        name: "queue",
        kept: 1,
        defaults: |a| vec![vec![format!("std::deque<{}>", a[0])]],
    },
    DefaultedTemplate {
        name: "unique_ptr",
        kept: 1,
        defaults: |a| vec![vec![format!("std::default_delete<{}>", a[0])]],
    },
    DefaultedTemplate {
        name: "set",
        kept: 1,
        defaults: |a| vec![vec![format!("std::less<{}>", a[0]), allocator(a[0])]],
    },
    DefaultedTemplate {
        name: "unordered_set",
        kept: 1,
        defaults: |a| {
            vec![vec![
                format!("std::hash<{}>", a[0]),
                format!("std::equal_to<{}>", a[0]),
                allocator(a[0]),
            ]]
        },
    },
    DefaultedTemplate {
        name: "map",
        kept: 2,
        defaults: |a| {
            pair_allocators(a[0], a[1])
                .into_iter()
                .map(|alloc| vec![format!("std::less<{}>", a[0]), alloc])
                .collect()
        },
    },
    DefaultedTemplate {
        name: "unordered_map",
        kept: 2,
        defaults: |a| {
            pair_allocators(a[0], a[1])
                .into_iter()
                .map(|alloc| {
                    vec![
                        format!("std::hash<{}>", a[0]),
                        format!("std::equal_to<{}>", a[0]),
                        alloc,
                    ]
                })
                .collect()
        },
    },
];

/// Rewrites applied to every generated header before it is written.
#[derive(Debug)]
pub struct Cleanup {
    rewrites: Vec<(Regex, String)>,
    templates: Regex,
}

impl Cleanup {
    /// Built-in rewrites followed by `extra`, in order.
    pub fn new(extra: &[Replacement]) -> Result<Self> {
        let mut rewrites = Vec::with_capacity(BUILTIN_REWRITES.len() + extra.len());
        for (pattern, replacement) in BUILTIN_REWRITES {
            rewrites.push((Regex::new(pattern)?, replacement.to_string()));
        }
        for r in extra {
            let regex = Regex::new(&r.pattern)
                .with_context(|| format!("Invalid cleanup pattern '{}'", r.pattern))?;
            rewrites.push((regex, r.replacement.clone()));
        }

        let names: Vec<&str> = DEFAULTED_TEMPLATES.iter().map(|t| t.name).collect();
        let templates = Regex::new(&format!(r"\bstd::({})<", names.join("|")))?;
        Ok(Self {
            rewrites,
            templates,
        })
    }

    /// Rewrite `text` until it no longer changes.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
        warn!("Cleanup did not settle after {} passes", MAX_PASSES);
        current
    }

    fn pass(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (regex, replacement) in &self.rewrites {
            out = regex.replace_all(&out, replacement.as_str()).into_owned();
        }
        self.strip_default_arguments(&out)
    }

    /// Drop defaulted trailing template arguments of the outermost
    /// matching templates; nested ones are handled by the next pass.
    fn strip_default_arguments(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some(found) = self.templates.captures_at(text, cursor) {
            let (Some(whole), Some(name)) = (found.get(0), found.get(1)) else {
                break;
            };
            let open = whole.end() - 1;
            let Some(close) = matching_angle(text, open) else {
                break;
            };

            out.push_str(&text[cursor..whole.start()]);
            let args = split_arguments(&text[open + 1..close]);
            match shortened(name.as_str(), &args) {
                Some(kept) => {
                    out.push_str(&text[whole.start()..=open]);
                    out.push_str(&kept.join(", "));
                    out.push('>');
                    cursor = close + 1;
                }
                None => {
                    out.push_str(whole.as_str());
                    cursor = whole.end();
                }
            }
        }

        out.push_str(&text[cursor..]);
        out
    }
}

/// Leading arguments of `std::<name><args>` when the rest are defaults.
fn shortened<'a>(name: &str, args: &[&'a str]) -> Option<Vec<&'a str>> {
    let template = DEFAULTED_TEMPLATES.iter().find(|t| t.name == name)?;
    if args.len() <= template.kept {
        return None;
    }
    let (kept, rest) = args.split_at(template.kept);
    let matches = (template.defaults)(kept).iter().any(|defaults| {
        defaults.len() == rest.len() && defaults.iter().zip(rest).all(|(a, b)| same_spelling(a, b))
    });
    matches.then(|| kept.to_vec())
}

fn same_spelling(a: &str, b: &str) -> bool {
    a.chars()
        .filter(|c| !c.is_whitespace())
        .eq(b.chars().filter(|c| !c.is_whitespace()))
}

/// Index of the `>` closing the `<` at `open`.
fn matching_angle(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            '\n' | ';' | '{' | '}' => return None,
            _ => {}
        }
    }
    None
}

/// Top-level comma separated arguments, trimmed.
fn split_arguments(text: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                args.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(text[start..].trim());
    args
}
