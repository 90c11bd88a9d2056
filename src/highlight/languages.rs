//! Per-language highlighting rules.
//!
//! Rules are applied in table order and later rules overwrite earlier ones
//! where they overlap, so each table lists keywords first and comments last.

/// Semantic category a rule colors its match with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    String,
    Comment,
    Number,
    /// Shell `$VAR` / `${VAR}` expansions
    Variable,
    /// `true`, `false`, `null` and friends
    Literal,
    JsonKey,
    JsonValue,
    Tag,
    Attribute,
    AttributeValue,
    TreeBranch,
    TreeFile,
    TreeLabel,
    TreeVersion,
    TreeArrow,
    TreeSuccess,
    TreeFailure,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RuleSource {
    Pattern(&'static str),
    Keywords {
        words: &'static [&'static str],
        case_insensitive: bool,
    },
    KeywordUnion(&'static [&'static [&'static str]]),
}

/// One highlighting pattern. `group` selects the capture that gets colored.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rule {
    pub key: &'static str,
    pub source: RuleSource,
    pub kind: TokenKind,
    pub group: usize,
}

const fn pattern(key: &'static str, source: &'static str, kind: TokenKind) -> Rule {
    Rule {
        key,
        source: RuleSource::Pattern(source),
        kind,
        group: 0,
    }
}

const fn captured(key: &'static str, source: &'static str, kind: TokenKind, group: usize) -> Rule {
    Rule {
        key,
        source: RuleSource::Pattern(source),
        kind,
        group,
    }
}

const fn keywords(key: &'static str, words: &'static [&'static str]) -> Rule {
    Rule {
        key,
        source: RuleSource::Keywords {
            words,
            case_insensitive: false,
        },
        kind: TokenKind::Keyword,
        group: 0,
    }
}

/// Languages with their own rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    SwiftKotlin,
    Python,
    JavaScript,
    CFamily,
    Java,
    Shell,
    Sql,
    Json,
    Html,
    Tree,
    /// Unrecognized tags: keyword union of several common languages
    Generic,
}

impl Language {
    /// Map a fence tag to a language; unknown non-empty tags are [`Self::Generic`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "swift" | "kotlin" | "kt" | "kts" => Self::SwiftKotlin,
            "python" | "py" | "python3" => Self::Python,
            "javascript" | "js" | "jsx" | "typescript" | "ts" | "tsx" | "mjs" => Self::JavaScript,
            "c" | "h" | "cpp" | "c++" | "cc" | "cxx" | "hpp" | "objc" | "objective-c"
            | "objectivec" | "m" | "mm" => Self::CFamily,
            "java" => Self::Java,
            "bash" | "sh" | "shell" | "zsh" | "console" => Self::Shell,
            "sql" => Self::Sql,
            "json" | "jsonc" => Self::Json,
            "html" | "htm" | "xml" | "svg" | "xhtml" | "plist" => Self::Html,
            "tree" | "directory" | "output" => Self::Tree,
            _ => Self::Generic,
        }
    }

    pub(crate) fn rules(self) -> &'static [Rule] {
        match self {
            Self::SwiftKotlin => SWIFT_KOTLIN,
            Self::Python => PYTHON,
            Self::JavaScript => JAVASCRIPT,
            Self::CFamily => C_FAMILY,
            Self::Java => JAVA,
            Self::Shell => SHELL,
            Self::Sql => SQL,
            Self::Json => JSON,
            Self::Html => HTML,
            Self::Tree => TREE,
            Self::Generic => GENERIC,
        }
    }
}

/// Fence tag for a source file extension, when the highlighter knows it.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let tag = match ext.to_ascii_lowercase().as_str() {
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "py" => "python",
        "js" | "mjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "m" | "mm" => "objc",
        "java" => "java",
        "sh" | "bash" | "zsh" => "bash",
        "sql" => "sql",
        "json" => "json",
        "html" | "htm" => "html",
        "xml" | "svg" | "plist" => "xml",
        _ => return None,
    };
    Some(tag)
}

const SWIFT_KOTLIN_WORDS: &[&str] = &[
    "as", "break", "case", "catch", "class", "companion", "continue", "data", "default", "defer",
    "do", "else", "enum", "extension", "false", "fun", "func", "guard", "if", "import", "in",
    "init", "interface", "internal", "is", "let", "nil", "null", "object", "open", "override",
    "package", "private", "protocol", "public", "return", "self", "sealed", "static", "struct",
    "super", "switch", "this", "throw", "throws", "true", "try", "typealias", "val", "var",
    "when", "where", "while", "async", "await", "suspend", "lazy", "weak",
];

const PYTHON_WORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "self",
];

const JAVASCRIPT_WORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "false", "finally", "for", "from",
    "function", "if", "import", "in", "instanceof", "interface", "let", "new", "null", "of",
    "return", "static", "super", "switch", "this", "throw", "true", "try", "type", "typeof",
    "undefined", "var", "void", "while", "yield", "enum", "implements", "private", "public",
    "readonly",
];

const C_FAMILY_WORDS: &[&str] = &[
    "auto", "bool", "break", "case", "char", "class", "const", "constexpr", "continue",
    "default", "delete", "do", "double", "else", "enum", "extern", "false", "float", "for",
    "goto", "if", "inline", "int", "long", "namespace", "new", "nullptr", "private",
    "protected", "public", "register", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "template", "this", "true", "typedef", "typename", "union", "unsigned",
    "using", "virtual", "void", "volatile", "while", "nil", "self", "YES", "NO", "id",
];

const JAVA_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "record",
    "return", "short", "static", "super", "switch", "synchronized", "this", "throw", "throws",
    "true", "try", "var", "void", "volatile", "while",
];

const SHELL_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "in", "function", "return", "local", "export", "readonly", "source", "echo", "exit", "set",
    "unset", "shift", "cd", "alias", "sudo", "eval", "exec", "trap",
];

const SQL_WORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "DROP", "ALTER", "ADD", "INDEX", "VIEW", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER",
    "FULL", "ON", "AS", "AND", "OR", "NOT", "NULL", "IS", "IN", "LIKE", "BETWEEN", "ORDER",
    "GROUP", "BY", "HAVING", "LIMIT", "OFFSET", "DISTINCT", "UNION", "ALL", "CASE", "WHEN",
    "THEN", "ELSE", "END", "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "DEFAULT", "COUNT", "SUM",
    "AVG", "MIN", "MAX", "ASC", "DESC", "EXISTS", "WITH", "RETURNING",
];

const DOUBLE_STRING: &str = r#""(?:[^"\\\n]|\\.)*""#;
const SINGLE_STRING: &str = r"'(?:[^'\\\n]|\\.)*'";
const NUMBER: &str = r"\b(?:0[xX][0-9a-fA-F]+|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\b";
const LINE_COMMENT: &str = r"//[^\n]*";
const BLOCK_COMMENT: &str = r"/\*[\s\S]*?\*/";
/// `#` comments that do not start inside a word (keeps `$#` and `${#x}` intact)
const HASH_COMMENT: &str = r"(?m)(?:^|[ \t])(#[^\n]*)";

static SWIFT_KOTLIN: &[Rule] = &[
    keywords("swift.keywords", SWIFT_KOTLIN_WORDS),
    pattern("swift.attribute", r"@[A-Za-z_]\w*", TokenKind::Keyword),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("swift.triple_string", r#""""[\s\S]*?""""#, TokenKind::String),
    pattern("common.line_comment", LINE_COMMENT, TokenKind::Comment),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

static PYTHON: &[Rule] = &[
    keywords("python.keywords", PYTHON_WORDS),
    pattern("python.decorator", r"(?m)^[ \t]*@[\w.]+", TokenKind::Keyword),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("python.triple_double", r#""""[\s\S]*?""""#, TokenKind::String),
    pattern("python.triple_single", r"'''[\s\S]*?'''", TokenKind::String),
    captured("common.hash_comment", HASH_COMMENT, TokenKind::Comment, 1),
];

static JAVASCRIPT: &[Rule] = &[
    keywords("javascript.keywords", JAVASCRIPT_WORDS),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("javascript.template", r"`(?:[^`\\]|\\[\s\S])*`", TokenKind::String),
    pattern("common.line_comment", LINE_COMMENT, TokenKind::Comment),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

static C_FAMILY: &[Rule] = &[
    keywords("c.keywords", C_FAMILY_WORDS),
    pattern("c.preprocessor", r"(?m)^[ \t]*#[ \t]*[A-Za-z]+", TokenKind::Keyword),
    pattern("c.objc_directive", r"@[A-Za-z]+\b", TokenKind::Keyword),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("common.line_comment", LINE_COMMENT, TokenKind::Comment),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

static JAVA: &[Rule] = &[
    keywords("java.keywords", JAVA_WORDS),
    pattern("java.annotation", r"@[A-Za-z_]\w*", TokenKind::Keyword),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("common.line_comment", LINE_COMMENT, TokenKind::Comment),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

static SHELL: &[Rule] = &[
    keywords("shell.keywords", SHELL_WORDS),
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern(
        "shell.variable",
        r"\$\{[^}\n]*\}|\$[A-Za-z_][A-Za-z0-9_]*|\$[0-9@#?*!$-]",
        TokenKind::Variable,
    ),
    captured("common.hash_comment", HASH_COMMENT, TokenKind::Comment, 1),
];

static SQL: &[Rule] = &[
    Rule {
        key: "sql.keywords",
        source: RuleSource::Keywords {
            words: SQL_WORDS,
            case_insensitive: true,
        },
        kind: TokenKind::Keyword,
        group: 0,
    },
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("sql.line_comment", r"--[^\n]*", TokenKind::Comment),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

static JSON: &[Rule] = &[
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("json.literal", r"\b(?:true|false|null)\b", TokenKind::Literal),
    pattern("json.string", r#""(?:[^"\\\n]|\\.)*""#, TokenKind::JsonValue),
    captured("json.key", r#"("(?:[^"\\\n]|\\.)*")\s*:"#, TokenKind::JsonKey, 1),
];

static HTML: &[Rule] = &[
    pattern("html.tag", r"</?[A-Za-z][\w:.-]*|/?>|<!DOCTYPE[^>]*>|<\?[\s\S]*?\?>", TokenKind::Tag),
    captured("html.attribute", r"\s([A-Za-z_:@][-\w:.]*)\s*=", TokenKind::Attribute, 1),
    captured("html.attribute_value", r#"=\s*("[^"]*"|'[^']*')"#, TokenKind::AttributeValue, 1),
    pattern("html.comment", r"<!--[\s\S]*?-->", TokenKind::Comment),
];

static TREE: &[Rule] = &[
    pattern("tree.branch", r"[├└│─┬┴┼┤┌┐┘]+", TokenKind::TreeBranch),
    pattern(
        "tree.file",
        r"[\w.@-]+\.(?:rs|toml|lock|swift|kt|py|js|mjs|ts|tsx|jsx|json|md|txt|yml|yaml|html|css|scss|sh|c|h|cpp|hpp|m|java|go|rb|xml|plist|png|jpg|jpeg|gif|svg|pdf|zip|gz|csv|sql|log|cfg|ini|env)\b",
        TokenKind::TreeFile,
    ),
    captured("tree.label", r"(?m)([A-Za-z][\w .-]*:)(?:[ \t]|$)", TokenKind::TreeLabel, 1),
    pattern(
        "tree.version",
        r"\bv?\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.]+)?\b",
        TokenKind::TreeVersion,
    ),
    pattern("tree.arrow", r"->|=>|<-|→|←|⇒", TokenKind::TreeArrow),
    pattern(
        "tree.success",
        r"\b(?:Compiling|Compiled|Finished|Running|Downloaded|Downloading|Installing|Installed|Updating|Updated|Building|Built|Added|Created|Done|OK|PASS|PASSED|passed|ok|success|Success|done)\b",
        TokenKind::TreeSuccess,
    ),
    pattern(
        "tree.failure",
        r"\b(?:Removed|Deleted|ERROR|Error|error|FAIL|FAILED|Failed|failed|WARNING|Warning|warning)\b",
        TokenKind::TreeFailure,
    ),
];

static GENERIC: &[Rule] = &[
    Rule {
        key: "generic.keywords",
        source: RuleSource::KeywordUnion(&[
            PYTHON_WORDS,
            JAVASCRIPT_WORDS,
            C_FAMILY_WORDS,
            JAVA_WORDS,
            SWIFT_KOTLIN_WORDS,
        ]),
        kind: TokenKind::Keyword,
        group: 0,
    },
    pattern("common.number", NUMBER, TokenKind::Number),
    pattern("common.double_string", DOUBLE_STRING, TokenKind::String),
    pattern("common.single_string", SINGLE_STRING, TokenKind::String),
    pattern("common.line_comment", LINE_COMMENT, TokenKind::Comment),
    captured("common.hash_comment", HASH_COMMENT, TokenKind::Comment, 1),
    pattern("common.block_comment", BLOCK_COMMENT, TokenKind::Comment),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_resolve_case_insensitively() {
        assert_eq!(Language::from_tag("Python"), Language::Python);
        assert_eq!(Language::from_tag("TS"), Language::JavaScript);
        assert_eq!(Language::from_tag("objective-c"), Language::CFamily);
        assert_eq!(Language::from_tag("ZSH"), Language::Shell);
        assert_eq!(Language::from_tag("directory"), Language::Tree);
    }

    #[test]
    fn test_unknown_tag_is_generic() {
        assert_eq!(Language::from_tag("cobol"), Language::Generic);
    }

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("TSX"), Some("typescript"));
        assert_eq!(language_for_extension("md"), None);
    }

    #[test]
    fn test_rule_keys_are_unique_per_pattern() {
        // A key shared by two rules must name the same pattern, or the cache
        // would hand one rule the other's regex.
        let all = [
            SWIFT_KOTLIN,
            PYTHON,
            JAVASCRIPT,
            C_FAMILY,
            JAVA,
            SHELL,
            SQL,
            JSON,
            HTML,
            TREE,
            GENERIC,
        ];
        let mut seen: std::collections::HashMap<&str, String> = std::collections::HashMap::new();
        for rule in all.iter().flat_map(|rules| rules.iter()) {
            let source = format!("{:?}", rule.source);
            if let Some(prev) = seen.insert(rule.key, source.clone()) {
                assert_eq!(prev, source, "key {} reused for a different pattern", rule.key);
            }
        }
    }
}
