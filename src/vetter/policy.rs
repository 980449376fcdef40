//! The module and name lists uploaded bot source is checked against.

/// Modules a bot may import. Submodules are matched on their root, so `collections.abc` is allowed.
pub const ALLOWED_IMPORTS: &[&str] = &[
    "abc",
    "collections",
    "copy",
    "dataclasses",
    "enum",
    "functools",
    "itertools",
    "math",
    "random",
    "time",
    "typing",
];

/// Modules that give access to the filesystem, processes, the network or the interpreter itself.
pub const DANGEROUS_IMPORTS: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "shutil",
    "glob",
    "pathlib",
    "requests",
    "urllib",
    "http",
    "socket",
    "socketserver",
    "pickle",
    "shelve",
    "marshal",
    "tempfile",
    "io",
    "importlib",
    "runpy",
    "__import__",
    "eval",
    "exec",
    "compile",
    "open",
    "input",
    "file",
    "execfile",
    "ctypes",
    "multiprocessing",
    "threading",
    "asyncio",
    "webbrowser",
    "platform",
    "site",
    "pty",
    "pwd",
    "grp",
    "resource",
    "signal",
    "codecs",
    "builtins",
    "__builtin__",
];

/// Builtins that evaluate code, import modules, open files or reach into namespaces by name.
pub const DANGEROUS_BUILTINS: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "__import__",
    "open",
    "input",
    "execfile",
    "file",
    "reload",
    "vars",
    "dir",
    "globals",
    "locals",
    "delattr",
    "setattr",
    "getattr",
    "hasattr",
];

/// Reflective attributes that lead from any object back to modules, code objects and builtins.
pub const DANGEROUS_ATTRIBUTES: &[&str] = &[
    "__dict__",
    "__class__",
    "__bases__",
    "__subclasses__",
    "__globals__",
    "__code__",
    "__builtins__",
    "__import__",
    "__loader__",
    "__spec__",
    "__path__",
    "__file__",
];

/// The builtin that opens files, reported a second time as a file operation.
pub const FILE_OPEN: &str = "open";

/// A set of lists to vet against. [Policy::default] is the standard arena policy.
#[derive(Debug, Clone)]
pub struct Policy {
    pub allowed_imports: Vec<&'static str>,
    pub dangerous_imports: Vec<&'static str>,
    pub dangerous_builtins: Vec<&'static str>,
    pub dangerous_attributes: Vec<&'static str>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            allowed_imports: ALLOWED_IMPORTS.to_vec(),
            dangerous_imports: DANGEROUS_IMPORTS.to_vec(),
            dangerous_builtins: DANGEROUS_BUILTINS.to_vec(),
            dangerous_attributes: DANGEROUS_ATTRIBUTES.to_vec(),
        }
    }
}

impl Policy {
    pub fn is_dangerous_module(&self, root: &str) -> bool {
        self.dangerous_imports.contains(&root)
    }

    pub fn is_allowed_module(&self, root: &str) -> bool {
        self.allowed_imports.contains(&root)
    }

    pub fn is_dangerous_builtin(&self, name: &str) -> bool {
        self.dangerous_builtins.contains(&name)
    }

    pub fn is_dangerous_attribute(&self, name: &str) -> bool {
        self.dangerous_attributes.contains(&name)
    }

    /// The allowed modules sorted and comma separated, for error messages.
    pub fn allowed_list(&self) -> String {
        let mut allowed = self.allowed_imports.clone();
        allowed.sort_unstable();
        allowed.join(", ")
    }
}

/// The first component of a dotted module path.
pub fn root_module(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}
