//! Interpreter-side bootstrap for sandboxed Python runs.
//!
//! The bootstrap is passed with `-c`, reads its namespace spec from `argv[1]`
//! and the user code from stdin, then evaluates the code against a namespace
//! holding only allow-listed builtins and modules. Modules are bound as
//! views carrying only their public attributes; submodules outside the
//! allow-list are left out, so `random._os` or `re.enum.sys` do not resolve.
//! Faults are written to stderr and reported through exit status
//! [`FAULT_EXIT_CODE`].

use serde::Serialize;

use crate::config::SandboxSection;

/// Exit status the bootstrap uses when the evaluated code raised.
pub const FAULT_EXIT_CODE: i32 = 3;

/// Short names bound for well-known libraries, keyed by root module.
pub const MODULE_ALIASES: &[(&str, &str, &str)] = &[
    ("numpy", "np", "numpy"),
    ("pandas", "pd", "pandas"),
    ("matplotlib", "plt", "matplotlib.pyplot"),
];

pub const BOOTSTRAP: &str = r#"
import builtins, importlib, json, re, sys, traceback, types, warnings

spec = json.loads(sys.argv[1])
source = sys.stdin.read()
allowed = set(spec["modules"])
views = {}

def check(name):
    root = name.split(".")[0]
    if root not in allowed:
        raise ImportError("module '%s' is not available in the sandbox" % name)
    if root == "matplotlib":
        importlib.import_module("matplotlib").use("Agg")

def view(module):
    name = module.__name__
    if name in views:
        return views[name]
    public = types.ModuleType(name)
    views[name] = public
    with warnings.catch_warnings():
        warnings.simplefilter("ignore")
        for attr in dir(module):
            if attr.startswith("_"):
                continue
            try:
                value = getattr(module, attr)
            except Exception:
                continue
            if isinstance(value, types.ModuleType):
                if value.__name__.split(".")[0] not in allowed:
                    continue
                value = view(value)
            setattr(public, attr, value)
    return public

def guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
    if level != 0:
        raise ImportError("relative imports are not available in the sandbox")
    check(name)
    return view(importlib.__import__(name, globals, locals, fromlist, level))

def load(name):
    check(name)
    return view(importlib.import_module(name))

safe = {n: getattr(builtins, n) for n in spec["builtins"] if hasattr(builtins, n)}
safe["__import__"] = guarded_import
safe["__build_class__"] = builtins.__build_class__
namespace = {"__builtins__": safe, "__name__": "__sandbox__"}

for binding, module in spec["bindings"]:
    if re.search(r"\b%s\b" % re.escape(binding), source):
        try:
            namespace[binding] = load(module)
        except Exception:
            pass

try:
    exec(compile(source, "<sandbox>", "exec"), namespace)
except BaseException as exc:
    sys.stdout.flush()
    sys.stderr.write("%s: %s\n%s" % (type(exc).__name__, exc, traceback.format_exc()))
    sys.stderr.flush()
    sys.exit(FAULT)
"#;

/// Namespace description handed to the bootstrap.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSpec {
    pub builtins: Vec<String>,
    pub modules: Vec<String>,
    /// `(name bound in the namespace, module imported for it)`
    pub bindings: Vec<(String, String)>,
}

impl NamespaceSpec {
    pub fn from_config(section: &SandboxSection) -> Self {
        let mut bindings = Vec::new();
        for module in &section.allowed_modules {
            bindings.push((module.clone(), module.clone()));
            for (root, alias, target) in MODULE_ALIASES {
                if module == root {
                    bindings.push((alias.to_string(), target.to_string()));
                }
            }
        }

        Self {
            builtins: section.allowed_builtins.clone(),
            modules: section.allowed_modules.clone(),
            bindings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The bootstrap script with its fault exit status filled in.
pub fn script() -> String {
    BOOTSTRAP.replace("FAULT", &FAULT_EXIT_CODE.to_string())
}
