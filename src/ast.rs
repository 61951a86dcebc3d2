/// AST 的根节点, 代表一个完整的过滤语句
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 字段过滤条件列表，彼此之间为 AND 关系
    pub filters: Vec<FieldFilter>,
}

/// 代表对单个字段的一个或多个过滤条件, 例如：`Status[NOT "Open"]`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: Identifier,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

/// 代表应用于单个字段的条件表达式树
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// 逻辑与运算 (AND)
    And(Box<Condition>, Box<Condition>),
    /// 逻辑或运算 (OR)
    Or(Box<Condition>, Box<Condition>),
    /// 逻辑非运算 (NOT)
    Not(Box<Condition>),
    /// 使用括号分组的条件表达式
    Grouped(Box<Condition>),
    /// 基础比较运算, 这是条件的叶子节点
    Comparison { op: CompOp, value: Literal },
    /// IN (...) 包含检查
    In(Vec<Literal>),
    /// LIKE 模式匹配
    Like(Literal),
    /// 空值检查
    IsNull,
    IsNotNull,
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,      // =
    NotEq,   // !=
    Gt,      // >
    Lt,      // <
    Gte,     // >=
    Lte,     // <=
}

/// 字面量值
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(i64),
    Float(f64),
    Boolean(bool),
    Null,
}
