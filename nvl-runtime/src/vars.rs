//! # 变量存储
//!
//! 脚本变量是固定的两位小写字母标识符（`$aa` 到 `$zz`，共 676 个），
//! 会话启动时全部预分配为 0。只支持带符号整数与 `=`、`+=`、`-=` 三种写操作；
//! 引用任何其他标识符都是错误。存档只记录非零项。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 赋值操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
}

/// 比较操作符（`.if` 指令）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    /// 识别脚本中的比较符号
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    pub fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// 右值：整数字面量或另一个变量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Literal(i64),
    Var(String),
}

/// 引用了不存在的变量
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("引用了不存在的变量 '${0}'")]
pub struct UnknownVar(pub String);

/// 变量表
///
/// BTreeMap 保证非零项以标识符升序导出，与存档格式一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarStore {
    values: BTreeMap<String, i64>,
}

impl VarStore {
    /// 预分配全部 676 个变量，初值 0
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        for c in b'a'..=b'z' {
            for d in b'a'..=b'z' {
                values.insert(format!("{}{}", c as char, d as char), 0);
            }
        }
        Self { values }
    }

    /// 读取变量
    pub fn get(&self, name: &str) -> Result<i64, UnknownVar> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| UnknownVar(name.to_string()))
    }

    /// 解析右值
    pub fn resolve(&self, operand: &Operand) -> Result<i64, UnknownVar> {
        match operand {
            Operand::Literal(n) => Ok(*n),
            Operand::Var(name) => self.get(name),
        }
    }

    /// 执行一次赋值
    pub fn apply(&mut self, name: &str, op: AssignOp, operand: &Operand) -> Result<(), UnknownVar> {
        let rhs = self.resolve(operand)?;
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| UnknownVar(name.to_string()))?;
        match op {
            AssignOp::Set => *slot = rhs,
            AssignOp::Add => *slot += rhs,
            AssignOp::Sub => *slot -= rhs,
        }
        Ok(())
    }

    /// 全部非零变量（按标识符升序）
    pub fn nonzero(&self) -> Vec<(String, i64)> {
        self.values
            .iter()
            .filter(|(_, v)| **v != 0)
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// 直接写入（读档恢复用）
    pub fn restore(&mut self, name: &str, value: i64) -> Result<(), UnknownVar> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| UnknownVar(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variables_preallocated() {
        let vars = VarStore::new();
        assert_eq!(vars.len(), 676);
        assert_eq!(vars.get("aa").unwrap(), 0);
        assert_eq!(vars.get("zz").unwrap(), 0);
    }

    #[test]
    fn test_assign_roundtrip() {
        let mut vars = VarStore::new();
        vars.apply("aa", AssignOp::Set, &Operand::Literal(5)).unwrap();
        vars.apply("aa", AssignOp::Add, &Operand::Literal(3)).unwrap();
        vars.apply("aa", AssignOp::Sub, &Operand::Literal(1)).unwrap();
        assert_eq!(vars.get("aa").unwrap(), 7);
    }

    #[test]
    fn test_var_to_var_assignment() {
        let mut vars = VarStore::new();
        vars.apply("ab", AssignOp::Set, &Operand::Literal(10)).unwrap();
        vars.apply("aa", AssignOp::Set, &Operand::Var("ab".to_string()))
            .unwrap();
        vars.apply("aa", AssignOp::Add, &Operand::Var("ab".to_string()))
            .unwrap();
        assert_eq!(vars.get("aa").unwrap(), 20);
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut vars = VarStore::new();
        assert!(vars.get("a1").is_err());
        assert!(vars.get("aaa").is_err());
        assert!(vars.apply("zz", AssignOp::Add, &Operand::Var("xyz".to_string())).is_err());
        // 出错的赋值不应产生部分效果
        assert_eq!(vars.get("zz").unwrap(), 0);
    }

    #[test]
    fn test_nonzero_sorted() {
        let mut vars = VarStore::new();
        vars.apply("zz", AssignOp::Set, &Operand::Literal(1)).unwrap();
        vars.apply("ab", AssignOp::Set, &Operand::Literal(-4)).unwrap();
        vars.apply("ka", AssignOp::Set, &Operand::Literal(9)).unwrap();
        let nonzero = vars.nonzero();
        assert_eq!(
            nonzero,
            vec![
                ("ab".to_string(), -4),
                ("ka".to_string(), 9),
                ("zz".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_comparator_eval() {
        assert!(Comparator::Lt.eval(1, 2));
        assert!(Comparator::Le.eval(2, 2));
        assert!(Comparator::Gt.eval(3, 2));
        assert!(Comparator::Ge.eval(2, 2));
        assert!(Comparator::Eq.eval(7, 7));
        assert!(Comparator::Ne.eval(7, 8));
        assert!(!Comparator::Eq.eval(7, 8));
    }
}
