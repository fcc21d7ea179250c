//! Surface type syntax and the resolved type algebra.

use std::fmt;

/// A type as it appears in source: unresolved syntax attached to
/// declarations, extern signatures and function definitions.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Int,
    Bool,
    Float,
    String,
    Void,
    Array(Box<TypeExpr>),
    Promise(Box<TypeExpr>),
    Channel(Box<TypeExpr>),
    Function {
        return_type: Box<TypeExpr>,
        params: Vec<TypeExpr>,
    },
}

/// A fully resolved type, as recorded in the annotation table.
///
/// Equality is structural and there are no implicit coercions anywhere in
/// the checker. Arrays carry their length so literals of different lengths
/// compare unequal; a length of zero is the resolution of the surface
/// `Array` syntax, which has no length to give.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Int,
    Bool,
    Float,
    String,
    Void,
    Array {
        elem: Box<Ty>,
        len: u32,
    },
    Promise(Box<Ty>),
    Channel(Box<Ty>),
    Function {
        return_type: Box<Ty>,
        params: Vec<Ty>,
        vararg: bool,
    },
}

impl Ty {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Int | Ty::Float)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Ty::Function { .. })
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Bool => write!(f, "bool"),
            Ty::Float => write!(f, "float"),
            Ty::String => write!(f, "string"),
            Ty::Void => write!(f, "void"),
            Ty::Array { elem, len } => write!(f, "{elem}[{len}]"),
            Ty::Promise(inner) => write!(f, "promise<{inner}>"),
            Ty::Channel(inner) => write!(f, "channel<{inner}>"),
            Ty::Function {
                return_type,
                params,
                vararg,
            } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                if *vararg {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ") -> {return_type}")
            }
        }
    }
}
