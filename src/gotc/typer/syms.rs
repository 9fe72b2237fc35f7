// Copyright (c) 2025 knix
// All rights reserved.

use std::cmp::Ordering;

use ahash::HashMapExt;
use fxhash::FxHashMap;

use crate::ast::NodeId;
use crate::idents::{Ident, IdentPool};
use crate::nz_u32_id;
use crate::pool::Pool;
use crate::span::SpanId;

nz_u32_id!(SymId);
nz_u32_id!(PkgId);

#[derive(Debug, Clone)]
pub struct Pkg {
    pub name: String,
    pub path: String,
    /// Escaped path, used as the symbol-name prefix
    pub prefix: String,
}

#[derive(Debug, Clone)]
pub struct Sym {
    pub name: Ident,
    pub pkg: PkgId,
    pub def: Option<NodeId>,
    /// Block that `def` was declared in
    pub block: i32,
    pub lastlineno: SpanId,
    pub uniq: bool,
}

pub struct Syms {
    pub idents: IdentPool,
    pkgs: Pool<Pkg, PkgId>,
    syms: Pool<Sym, SymId>,
    table: FxHashMap<(PkgId, Ident), SymId>,
    pub builtin_pkg: PkgId,
    pub local_pkg: PkgId,
    pub unsafe_pkg: PkgId,
}

/// Mirrors the escaping a linker applies to import paths: control characters,
/// '%' and '"' anywhere, and '.' after the last slash.
pub fn path_to_prefix(path: &str) -> String {
    let last_slash = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let mut out = String::with_capacity(path.len());
    for (i, c) in path.char_indices() {
        let needs_escape =
            c <= ' ' || (c == '.' && i >= last_slash) || c == '%' || c == '"' || c >= '\u{7f}';
        if needs_escape && c.is_ascii() {
            out.push_str(&format!("%{:02x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

impl Syms {
    pub fn new(local_pkg_path: &str) -> Syms {
        let mut pkgs = Pool::new("pkgs");
        let builtin_pkg = pkgs.add(Pkg {
            name: "go.builtin".to_string(),
            path: "go.builtin".to_string(),
            prefix: "go.builtin".to_string(),
        });
        let local_pkg = pkgs.add(Pkg {
            name: String::new(),
            path: local_pkg_path.to_string(),
            prefix: "\"\"".to_string(),
        });
        let unsafe_pkg = pkgs.add(Pkg {
            name: "unsafe".to_string(),
            path: "unsafe".to_string(),
            prefix: "unsafe".to_string(),
        });
        Syms {
            idents: IdentPool::make(),
            pkgs,
            syms: Pool::with_capacity("syms", 1024),
            table: FxHashMap::with_capacity(1024),
            builtin_pkg,
            local_pkg,
            unsafe_pkg,
        }
    }

    pub fn mkpkg(&mut self, path: &str) -> PkgId {
        if let Some((id, _)) = self.pkgs.iter_with_ids().find(|(_, p)| p.path == path) {
            return id;
        }
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.pkgs.add(Pkg { name, path: path.to_string(), prefix: path_to_prefix(path) })
    }

    pub fn pkg(&self, id: PkgId) -> &Pkg {
        self.pkgs.get(id)
    }

    pub fn lookup(&mut self, pkg: PkgId, name: &str) -> SymId {
        let ident = self.idents.intern(name);
        self.lookup_ident(pkg, ident)
    }

    pub fn lookup_ident(&mut self, pkg: PkgId, name: Ident) -> SymId {
        if let Some(s) = self.table.get(&(pkg, name)) {
            return *s;
        }
        let s = self.syms.add(Sym {
            name,
            pkg,
            def: None,
            block: 0,
            lastlineno: SpanId::NONE,
            uniq: false,
        });
        self.table.insert((pkg, name), s);
        s
    }

    pub fn local(&mut self, name: &str) -> SymId {
        self.lookup(self.local_pkg, name)
    }

    pub fn get(&self, id: SymId) -> &Sym {
        self.syms.get(id)
    }

    pub fn get_mut(&mut self, id: SymId) -> &mut Sym {
        self.syms.get_mut(id)
    }

    pub fn name(&self, id: SymId) -> &str {
        self.idents.get_name(self.syms.get(id).name)
    }

    pub fn is_blank(&self, id: SymId) -> bool {
        self.syms.get(id).name == self.idents.b.blank
    }

    pub fn is_exported(&self, id: SymId) -> bool {
        exportname(self.name(id))
    }

    /// Qualified form for messages: local and builtin names are bare
    pub fn qualified_name(&self, id: SymId) -> String {
        let s = self.get(id);
        if s.pkg == self.local_pkg || s.pkg == self.builtin_pkg {
            self.name(id).to_string()
        } else {
            format!("{}.{}", self.pkg(s.pkg).name, self.name(id))
        }
    }

    /// Ordering used by the backend's type comparison. Fast, not pretty: name
    /// length, then package prefix length and contents, then the name itself.
    pub fn cmpsym(&self, r: Option<SymId>, s: Option<SymId>) -> Ordering {
        let (r, s) = match (r, s) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(r), Some(s)) if r == s => return Ordering::Equal,
            (Some(r), Some(s)) => (r, s),
        };
        let rname = self.name(r);
        let sname = self.name(s);
        if rname.len() != sname.len() {
            return rname.len().cmp(&sname.len());
        }
        let rpkg = self.get(r).pkg;
        let spkg = self.get(s).pkg;
        if rpkg != spkg {
            let rprefix = &self.pkg(rpkg).prefix;
            let sprefix = &self.pkg(spkg).prefix;
            if rprefix.len() != sprefix.len() {
                return rprefix.len().cmp(&sprefix.len());
            }
            if rprefix != sprefix {
                return rprefix.cmp(sprefix);
            }
        }
        rname.cmp(sname)
    }
}

pub fn exportname(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn prefix_escapes_dots_in_last_element() {
        assert_eq!(path_to_prefix("golang.org/x/net.v2"), "golang.org/x/net%2ev2");
        assert_eq!(path_to_prefix("fmt"), "fmt");
        assert_eq!(path_to_prefix("a b"), "a%20b");
    }

    #[test]
    fn cmpsym_order() {
        let mut syms = Syms::new("main");
        let other = syms.mkpkg("zz");
        let a = syms.local("ab");
        let b = syms.local("abc");
        let c = syms.local("ac");
        let d = syms.lookup(other, "ab");
        assert_eq!(syms.cmpsym(Some(a), Some(b)), Ordering::Less);
        assert_eq!(syms.cmpsym(Some(a), Some(c)), Ordering::Less);
        assert_eq!(syms.cmpsym(Some(c), Some(a)), Ordering::Greater);
        assert_eq!(syms.cmpsym(None, Some(a)), Ordering::Less);
        assert_eq!(syms.cmpsym(Some(a), Some(a)), Ordering::Equal);
        // "\"\"" has 2 bytes and "zz" has 2 bytes; '"' sorts before 'z'
        assert_eq!(syms.cmpsym(Some(a), Some(d)), Ordering::Less);
        let exported = syms.local("Exported");
        assert!(syms.is_exported(exported) && !syms.is_exported(a));
    }
}
