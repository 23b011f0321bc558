use crate::terms::{Declaration, SmtTerm};

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => name.clone(),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BoolLit(b) => b.to_string(),
        SmtTerm::Add(terms) => nary("+", "0", terms),
        SmtTerm::Mul(lhs, rhs) => format!("(* {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Eq(lhs, rhs) => format!("(= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Ge(lhs, rhs) => format!("(>= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::And(terms) => nary("and", "true", terms),
        SmtTerm::Or(terms) => nary("or", "false", terms),
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => {
            format!("(=> {} {})", to_smtlib(lhs), to_smtlib(rhs))
        }
    }
}

fn nary(op: &str, unit: &str, terms: &[SmtTerm]) -> String {
    match terms {
        [] => unit.to_string(),
        [single] => to_smtlib(single),
        _ => {
            let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
            format!("({op} {})", inner.join(" "))
        }
    }
}

/// Render a full `check-sat` script for the given declarations and assertions.
pub fn to_smtlib_script(decls: &[Declaration], assertions: &[SmtTerm]) -> String {
    let mut out = String::new();
    for (name, sort) in decls {
        out.push_str(&format!("(declare-const {name} {})\n", sort.smtlib_name()));
    }
    for assertion in assertions {
        out.push_str(&format!("(assert {})\n", to_smtlib(assertion)));
    }
    out.push_str("(check-sat)\n");
    out
}
