/// SMT sorts used by stage formulas (Bool) and T-invariant systems (Int).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
}

impl SmtSort {
    /// SMT-LIB2 spelling of the sort.
    pub fn smtlib_name(self) -> &'static str {
        match self {
            SmtSort::Bool => "Bool",
            SmtSort::Int => "Int",
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.smtlib_name())
    }
}
