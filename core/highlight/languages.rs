use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Swift,
    Java,
    Kotlin,
    C,
    Cpp,
    ObjectiveC,
    CSharp,
    Go,
    Ruby,
    Php,
    Shell,
    Sql,
    Json,
    Yaml,
    Toml,
    Markdown,
    Html,
    Xml,
    Css,
}

/// How a language is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Keywords, comments, strings and numbers.
    Code,
    /// Keys, strings, numbers and literals.
    Data,
    Markdown,
    Markup,
}

#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub family: Family,
    pub keywords: &'static [&'static str],
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Single quotes delimit strings (as opposed to char literals or lifetimes).
    pub single_quote_strings: bool,
}

const C_LIKE_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while", "NULL",
];

const CPP_KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "catch", "char", "class", "const", "constexpr", "continue",
    "default", "delete", "do", "double", "else", "enum", "explicit", "extern", "false", "float",
    "for", "friend", "if", "inline", "int", "long", "namespace", "new", "nullptr", "operator",
    "private", "protected", "public", "return", "short", "sizeof", "static", "struct", "switch",
    "template", "this", "throw", "true", "try", "typedef", "typename", "union", "unsigned",
    "using", "virtual", "void", "while",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "False", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "None", "nonlocal", "not", "or", "pass", "raise", "return", "True", "try",
    "while", "with", "yield",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "let", "new", "null", "of", "return",
    "static", "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var",
    "void", "while", "yield",
];

const TS_KEYWORDS: &[&str] = &[
    "abstract", "any", "as", "async", "await", "boolean", "break", "case", "catch", "class",
    "const", "continue", "declare", "default", "do", "else", "enum", "export", "extends",
    "false", "finally", "for", "from", "function", "if", "implements", "import", "in",
    "interface", "keyof", "let", "namespace", "never", "new", "null", "number", "private",
    "protected", "public", "readonly", "return", "string", "super", "switch", "this", "throw",
    "true", "try", "type", "typeof", "undefined", "unknown", "var", "void", "while",
];

const SWIFT_KEYWORDS: &[&str] = &[
    "actor", "as", "async", "await", "break", "case", "catch", "class", "continue", "default",
    "defer", "do", "else", "enum", "extension", "false", "fileprivate", "for", "func", "guard",
    "if", "import", "in", "init", "internal", "is", "let", "nil", "override", "private",
    "protocol", "public", "repeat", "return", "self", "static", "struct", "switch", "throw",
    "throws", "true", "try", "var", "where", "while",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "continue",
    "default", "do", "double", "else", "enum", "extends", "false", "final", "finally", "float",
    "for", "if", "implements", "import", "instanceof", "int", "interface", "long", "new",
    "null", "package", "private", "protected", "public", "return", "short", "static", "super",
    "switch", "synchronized", "this", "throw", "throws", "true", "try", "void", "while",
];

const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "companion", "continue", "data", "do", "else", "false", "for",
    "fun", "if", "import", "in", "interface", "is", "null", "object", "override", "package",
    "private", "public", "return", "sealed", "super", "this", "throw", "true", "try", "val",
    "var", "when", "while",
];

const OBJC_KEYWORDS: &[&str] = &[
    "@interface", "@implementation", "@end", "@property", "@protocol", "@synthesize", "break",
    "case", "char", "const", "continue", "default", "do", "else", "enum", "for", "id", "if",
    "int", "nil", "NO", "return", "self", "static", "struct", "super", "switch", "void",
    "while", "YES",
];

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "base", "bool", "break", "case", "catch", "class",
    "const", "continue", "default", "do", "else", "enum", "false", "finally", "for", "foreach",
    "if", "in", "int", "interface", "internal", "is", "namespace", "new", "null", "override",
    "private", "protected", "public", "readonly", "return", "sealed", "static", "string",
    "struct", "switch", "this", "throw", "true", "try", "using", "var", "virtual", "void",
    "while",
];

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "false", "for", "func", "go", "goto", "if", "import", "interface", "map", "nil", "package",
    "range", "return", "select", "struct", "switch", "true", "type", "var",
];

const RUBY_KEYWORDS: &[&str] = &[
    "alias", "and", "begin", "break", "case", "class", "def", "do", "else", "elsif", "end",
    "ensure", "false", "for", "if", "in", "module", "next", "nil", "not", "or", "redo",
    "rescue", "retry", "return", "self", "super", "then", "true", "unless", "until", "when",
    "while", "yield",
];

const PHP_KEYWORDS: &[&str] = &[
    "abstract", "array", "as", "break", "case", "catch", "class", "const", "continue",
    "default", "do", "echo", "else", "elseif", "extends", "false", "final", "for", "foreach",
    "function", "if", "implements", "include", "interface", "namespace", "new", "null",
    "private", "protected", "public", "require", "return", "static", "switch", "throw", "true",
    "try", "use", "while",
];

const SHELL_KEYWORDS: &[&str] = &[
    "case", "do", "done", "elif", "else", "esac", "export", "fi", "for", "function", "if", "in",
    "local", "return", "select", "then", "until", "while",
];

const SQL_KEYWORDS: &[&str] = &[
    "ALTER", "AND", "AS", "BY", "CREATE", "DELETE", "DROP", "FROM", "GROUP", "INDEX", "INSERT",
    "INTO", "JOIN", "LEFT", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER", "PRIMARY", "KEY",
    "SELECT", "SET", "TABLE", "UPDATE", "VALUES", "WHERE", "select", "from", "where", "insert",
    "update", "delete", "create", "table", "join", "and", "or", "not", "null",
];

const CSS_KEYWORDS: &[&str] = &["@media", "@import", "@keyframes", "!important"];

const fn code(
    keywords: &'static [&'static str],
    line_comments: &'static [&'static str],
    block_comment: Option<(&'static str, &'static str)>,
    single_quote_strings: bool,
) -> LanguageSpec {
    LanguageSpec {
        family: Family::Code,
        keywords,
        line_comments,
        block_comment,
        single_quote_strings,
    }
}

const fn other(family: Family) -> LanguageSpec {
    LanguageSpec {
        family,
        keywords: &[],
        line_comments: &[],
        block_comment: None,
        single_quote_strings: false,
    }
}

const C_BLOCK: Option<(&str, &str)> = Some(("/*", "*/"));

impl Language {
    pub const ALL: [Language; 23] = [
        Language::Rust,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Swift,
        Language::Java,
        Language::Kotlin,
        Language::C,
        Language::Cpp,
        Language::ObjectiveC,
        Language::CSharp,
        Language::Go,
        Language::Ruby,
        Language::Php,
        Language::Shell,
        Language::Sql,
        Language::Json,
        Language::Yaml,
        Language::Toml,
        Language::Markdown,
        Language::Html,
        Language::Xml,
        Language::Css,
    ];

    /// Static extension table. Extensions without an entry are not highlighted.
    pub fn from_extension(extension: &str) -> Option<Language> {
        let lang = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "swift" => Language::Swift,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "c" | "h" => Language::C,
            "cpp" | "hpp" | "cc" | "cxx" | "hh" => Language::Cpp,
            "m" | "mm" => Language::ObjectiveC,
            "cs" => Language::CSharp,
            "go" => Language::Go,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" | "zsh" => Language::Shell,
            "sql" => Language::Sql,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "md" | "markdown" => Language::Markdown,
            "html" | "htm" => Language::Html,
            "xml" | "svg" | "plist" => Language::Xml,
            "css" | "scss" => Language::Css,
            _ => return None,
        };
        Some(lang)
    }

    pub fn id(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Swift => "swift",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::ObjectiveC => "objectivec",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Shell => "shell",
            Language::Sql => "sql",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Markdown => "markdown",
            Language::Html => "html",
            Language::Xml => "xml",
            Language::Css => "css",
        }
    }

    pub fn spec(self) -> LanguageSpec {
        match self {
            Language::Rust => code(RUST_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Python => code(PYTHON_KEYWORDS, &["#"], None, true),
            Language::JavaScript => code(JS_KEYWORDS, &["//"], C_BLOCK, true),
            Language::TypeScript => code(TS_KEYWORDS, &["//"], C_BLOCK, true),
            Language::Swift => code(SWIFT_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Java => code(JAVA_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Kotlin => code(KOTLIN_KEYWORDS, &["//"], C_BLOCK, false),
            Language::C => code(C_LIKE_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Cpp => code(CPP_KEYWORDS, &["//"], C_BLOCK, false),
            Language::ObjectiveC => code(OBJC_KEYWORDS, &["//"], C_BLOCK, false),
            Language::CSharp => code(CSHARP_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Go => code(GO_KEYWORDS, &["//"], C_BLOCK, false),
            Language::Ruby => code(RUBY_KEYWORDS, &["#"], None, true),
            Language::Php => code(PHP_KEYWORDS, &["//", "#"], C_BLOCK, true),
            Language::Shell => code(SHELL_KEYWORDS, &["#"], None, true),
            Language::Sql => code(SQL_KEYWORDS, &["--"], C_BLOCK, true),
            Language::Css => code(CSS_KEYWORDS, &[], C_BLOCK, true),
            Language::Json | Language::Yaml | Language::Toml => other(Family::Data),
            Language::Markdown => other(Family::Markdown),
            Language::Html | Language::Xml => other(Family::Markup),
        }
    }

    /// Line comment marker for data languages that have one.
    pub fn data_comment(self) -> Option<&'static str> {
        match self {
            Language::Yaml | Language::Toml => Some("#"),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
