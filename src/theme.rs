//! Built-in reading themes registered on every rendition.

/// One CSS rule: a selector and its declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRule {
    pub selector: &'static str,
    pub declarations: &'static [(&'static str, &'static str)],
}

/// A named set of rules the engine injects into rendered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub rules: &'static [ThemeRule],
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "light",
        rules: &[
            ThemeRule {
                selector: "body",
                declarations: &[
                    ("background", "hsl(var(--background))"),
                    ("color", "hsl(var(--foreground))"),
                ],
            },
            ThemeRule {
                selector: "a:hover",
                declarations: &[("color", "#0000EE")],
            },
        ],
    },
    Theme {
        name: "dark",
        rules: &[
            ThemeRule {
                selector: "body",
                declarations: &[("background", "#1e1e2e"), ("color", "#cdd6f4")],
            },
            ThemeRule {
                selector: "a:hover",
                declarations: &[("color", "#89b4fa")],
            },
        ],
    },
    Theme {
        name: "sepia",
        rules: &[
            ThemeRule {
                selector: "body",
                declarations: &[("background", "#f4ecd8"), ("color", "#5b4636")],
            },
            ThemeRule {
                selector: "a:hover",
                declarations: &[("color", "#8b4513")],
            },
        ],
    },
];

/// Default theme name.
pub const DEFAULT_THEME: &str = "light";

/// Look up a built-in theme by name.
pub fn get(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}
