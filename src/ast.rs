use internment::Intern;

/// Interned identifier; variables and functions live in separate tables but
/// share the same name type.
pub type Symbol = Intern<String>;

pub fn symbol(name: &str) -> Symbol {
    Intern::new(name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Le,
    Lt,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    pub fn spelling(self) -> &'static str {
        match self {
            CompareOp::Le => "<=",
            CompareOp::Lt => "<",
            CompareOp::Eq => "==",
            CompareOp::Ne => "<>",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    IntDiv,
    Mod,
}

impl BinOp {
    pub fn spelling(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "**",
            BinOp::IntDiv => "div",
            BinOp::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Str(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Var(Symbol),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    AndAlso(Box<Expr>, Box<Expr>),
    OrElse(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `item in container`
    Member {
        item: Box<Expr>,
        container: Box<Expr>,
    },
    /// `head :: tail`
    Cons {
        head: Box<Expr>,
        tail: Box<Expr>,
    },
    /// `target[i][j]...`, indices applied left to right.
    Index {
        target: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// `#field target`, `field` counts from 1.
    TupleIndex {
        field: i64,
        target: Box<Expr>,
    },
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: Symbol,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Print(Expr),
    Assign {
        name: Symbol,
        value: Expr,
    },
    IndexAssign {
        name: Symbol,
        indices: Vec<Expr>,
        value: Expr,
    },
    Block(Block),
    If(If),
    IfElse {
        branch: If,
        otherwise: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Call(Call),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block(pub Vec<Stmt>);

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub then: Block,
}

/// `fun name(params) = body ret`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub body: Block,
    pub ret: Expr,
}

/// Root of a parsed program: every function definition, hoisted, followed by
/// the block that runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
    pub main: Block,
}
