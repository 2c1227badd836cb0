//! ASCII tree-diagram rendering backing the containers' debug dumps.

/// Child renderer: receives the indentation prefix for its subtree and
/// returns the rendered child.
pub type PrintChild<'a> = Box<dyn Fn(&str) -> String + 'a>;

/// Render `children` as branches under the current line.
pub fn print_tree(tab: &str, children: &[Option<PrintChild<'_>>]) -> String {
    let mut out = String::new();
    let Some(last) = children.iter().rposition(|c| c.is_some()) else {
        return out;
    };
    for (i, child) in children.iter().enumerate().take(last + 1) {
        let Some(child_fn) = child else {
            continue;
        };
        let is_last = i == last;
        let child_tab = format!("{tab}{}  ", if is_last { " " } else { "│" });
        let rendered = child_fn(&child_tab);
        let branch = if rendered.is_empty() {
            "│"
        } else if is_last {
            "└─"
        } else {
            "├─"
        };
        out.push('\n');
        out.push_str(tab);
        out.push_str(branch);
        if !rendered.is_empty() {
            out.push(' ');
            out.push_str(&rendered);
        }
    }
    out
}

/// Two-child variant with `←`/`→` markers for the left and right branch.
pub fn print_binary<'a>(
    tab: &str,
    left: Option<PrintChild<'a>>,
    right: Option<PrintChild<'a>>,
) -> String {
    let left = left.map(|f| Box::new(move |tab: &str| format!("← {}", f(tab))) as PrintChild<'a>);
    let right = right.map(|f| Box::new(move |tab: &str| format!("→ {}", f(tab))) as PrintChild<'a>);
    print_tree(tab, &[left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Option<PrintChild<'_>> {
        Some(Box::new(move |_: &str| text.to_string()))
    }

    #[test]
    fn renders_branches() {
        let out = print_tree("", &[leaf("a"), leaf("b")]);
        assert_eq!(out, "\n├─ a\n└─ b");
    }

    #[test]
    fn skips_missing_children() {
        let out = print_tree("", &[None, leaf("only")]);
        assert_eq!(out, "\n└─ only");
    }

    #[test]
    fn binary_dump_marks_sides() {
        let out = print_binary("", leaf("l"), leaf("r"));
        assert_eq!(out, "\n├─ ← l\n└─ → r");
    }
}
