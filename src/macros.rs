//! 宏集合：可变参数调用封装、`keyset!`，以及 crate 内部生成谓词入口方法的宏。

#[doc(hidden)]
#[macro_export]
macro_rules! __collect_strings {
    () => {
        Vec::<String>::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut values = Vec::<String>::new();
        $(
            $crate::extend_into_strings($value, &mut values);
        )*
        values
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __builder_with_strings {
    ($builder:expr, $method:ident $(, $arg:expr)* $(,)?) => {
        $builder.$method($crate::__collect_strings!($($arg),*))
    };
}

pub trait IntoStrings {
    fn extend_into_strings(self, dst: &mut Vec<String>);
}

impl IntoStrings for String {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self);
    }
}

impl IntoStrings for &str {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self.to_string());
    }
}

impl<const N: usize, T> IntoStrings for [T; N]
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

impl<T> IntoStrings for &[T]
where
    T: Into<String> + Clone,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        for item in self {
            dst.push(item.clone().into());
        }
    }
}

impl<T> IntoStrings for Vec<T>
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

#[doc(hidden)]
pub fn extend_into_strings<T>(value: T, dst: &mut Vec<String>)
where
    T: IntoStrings,
{
    value.extend_into_strings(dst);
}

/// `select_all!(cb, "d.id", "d.name")` 等价于 `cb.select_all(vec![...])`。
#[macro_export]
macro_rules! select_all {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, select_all $(, $col)*)
    };
}
pub use crate::select_all;

/// `group_by_all!(cb, "d.age", "d.owner")`。
#[macro_export]
macro_rules! group_by_all {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, group_by_all $(, $col)*)
    };
}
pub use crate::group_by_all;

/// `partition_by_all!(window, "d.owner", "d.age")`。
#[macro_export]
macro_rules! partition_by_all {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, partition_by_all $(, $col)*)
    };
}
pub use crate::partition_by_all;

/// 由值列表构造 [`Keyset`](crate::keyset::Keyset)：`keyset![10, "abc"]`。
#[macro_export]
macro_rules! keyset {
    ($($value:expr),* $(,)?) => {
        $crate::keyset::Keyset::new(vec![$($crate::value::SqlValue::from($value)),*])
    };
}

/// 生成一组谓词入口方法（WHERE/HAVING/ON/WHEN 共用同一形状，只是方法名不同）。
/// 既可以展开成 trait 默认方法，也可以展开成分组类型上的固有方法。
macro_rules! predicate_entry_methods {
    (
        $vis:vis clause = $clause:expr;
        marker = $marker:ty;
        start = $start:ident;
        start_expr = $start_expr:ident;
        not = $not:ident;
        exists = $exists:ident;
        not_exists = $not_exists:ident;
        case = $case:ident;
        subquery = $subquery:ident;
        subqueries = $subqueries:ident;
    ) => {
        /// 以文本表达式作为谓词左侧。
        $vis fn $start(
            self,
            expression: &str,
        ) -> ::std::result::Result<
            $crate::restriction::RestrictionBuilder<Self>,
            $crate::error::BuildError,
        > {
            let left = $crate::builder::BuilderContext::parse_expression(&self, $clause, expression)?;
            Ok($crate::restriction::RestrictionBuilder::new(self, $clause, left))
        }

        $vis fn $start_expr(
            self,
            expr: $crate::expr::Expr,
        ) -> $crate::restriction::RestrictionBuilder<Self> {
            $crate::restriction::RestrictionBuilder::new(self, $clause, expr)
        }

        /// 整组取反：`NOT (a AND b)`。
        $vis fn $not(
            self,
        ) -> $crate::predicate_group::PredicateGroup<Self, $crate::predicate_group::And, $marker> {
            $crate::predicate_group::PredicateGroup::new(self, true)
        }

        $vis fn $exists(
            self,
        ) -> $crate::subquery::SubqueryBuilder<$crate::slot::SubqueryPredicate<Self>> {
            $crate::subquery::exists_subquery(self, $clause, false)
        }

        $vis fn $not_exists(
            self,
        ) -> $crate::subquery::SubqueryBuilder<$crate::slot::SubqueryPredicate<Self>> {
            $crate::subquery::exists_subquery(self, $clause, true)
        }

        /// 以 CASE 表达式作为谓词左侧。
        $vis fn $case(
            self,
        ) -> $crate::case_when::CaseWhenStarter<$crate::slot::LeftHandSlot<Self>> {
            $crate::case_when::CaseWhenStarter::new($crate::slot::LeftHandSlot::new(self, $clause))
        }

        /// 以子查询作为谓词左侧。
        $vis fn $subquery(
            self,
        ) -> $crate::subquery::SubqueryBuilder<$crate::slot::LeftHandSlot<Self>> {
            $crate::subquery::SubqueryBuilder::new($crate::slot::LeftHandSlot::new(self, $clause))
        }

        /// 以含多个子查询别名的表达式模板作为谓词左侧。
        $vis fn $subqueries(
            self,
            template: &str,
        ) -> ::std::result::Result<
            $crate::subquery::MultipleSubqueryBuilder<$crate::slot::LeftHandSlot<Self>>,
            $crate::error::BuildError,
        > {
            $crate::subquery::MultipleSubqueryBuilder::new(
                $crate::slot::LeftHandSlot::new(self, $clause),
                template,
            )
        }
    };
}
pub(crate) use predicate_entry_methods;
