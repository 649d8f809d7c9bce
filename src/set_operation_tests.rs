#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, QueryExpression, SetOperator};
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    #[test]
    fn union_with_final_order_and_limit() -> Result<(), BuildError> {
        let set = pg()
            .from("Document", "d")?
            .select("d.name")?
            .where_("d.age")?
            .lt(10)
            .union()
            .from("Person", "p")?
            .select("p.name")?
            .end_set()
            .order_by_asc("name")?
            .limit(5);
        assert_eq!(
            set.render().unwrap().sql,
            "SELECT d.name FROM Document d WHERE d.age < :param_0 \
             UNION SELECT p.name FROM Person p \
             ORDER BY name ASC NULLS LAST LIMIT :param_1"
        );
        Ok(())
    }

    #[test]
    fn chained_operators_keep_their_order() -> Result<(), BuildError> {
        let set = pg()
            .from("A", "a")?
            .select("a.id")?
            .union_all()
            .from("B", "b")?
            .select("b.id")?
            .except()
            .from("C", "c")?
            .select("c.id")?
            .end_set();

        let model = set.model();
        assert_eq!(
            model.rest.iter().map(|(op, _)| *op).collect::<Vec<_>>(),
            vec![SetOperator::UnionAll, SetOperator::Except]
        );
        assert_eq!(
            set.render().unwrap().sql,
            "SELECT a.id FROM A a UNION ALL SELECT b.id FROM B b EXCEPT SELECT c.id FROM C c"
        );
        Ok(())
    }

    #[test]
    fn nested_groups_are_parenthesized() -> Result<(), BuildError> {
        let set = pg()
            .from("A", "a")?
            .select("a.id")?
            .start_except()
            .from("B", "b")?
            .select("b.id")?
            .union()
            .from("C", "c")?
            .select("c.id")?
            .end_set()
            .intersect()
            .from("D", "d")?
            .select("d.id")?
            .end_set();

        assert!(matches!(set.model().rest[0].1, QueryExpression::Set(_)));
        assert_eq!(
            set.render().unwrap().sql,
            "SELECT a.id FROM A a EXCEPT (SELECT b.id FROM B b UNION SELECT c.id FROM C c) \
             INTERSECT SELECT d.id FROM D d"
        );
        Ok(())
    }

    #[test]
    fn operand_with_limit_is_parenthesized() -> Result<(), BuildError> {
        let set = pg()
            .from("A", "a")?
            .select("a.id")?
            .union()
            .from("B", "b")?
            .select("b.id")?
            .order_by_asc("b.id")?
            .limit(3)
            .end_set();
        assert_eq!(
            set.render().unwrap().sql,
            "SELECT a.id FROM A a UNION (SELECT b.id FROM B b ORDER BY b.id ASC NULLS LAST LIMIT :param_0)"
        );
        Ok(())
    }

    #[test]
    fn ctes_are_hoisted_before_the_set() -> Result<(), BuildError> {
        let set = pg()
            .with("X")?
            .bind("id", "p.id")?
            .from("Person", "p")?
            .end()?
            .from("X", "x")?
            .select("x.id")?
            .union_all()
            .from("X", "y")?
            .select("y.id")?
            .end_set();
        assert_eq!(
            set.render().unwrap().sql,
            "WITH X(id) AS (SELECT p.id FROM Person p) \
             SELECT x.id FROM X x UNION ALL SELECT y.id FROM X y"
        );
        Ok(())
    }

    #[test]
    fn operands_bind_their_own_parameters() -> Result<(), BuildError> {
        let set = pg()
            .from("A", "a")?
            .where_("a.id")?
            .gt_expression(":low")?
            .set_parameter("low", 1)?
            .union()
            .from("B", "b")?
            .where_("b.id")?
            .lt_expression(":high")?
            .set_parameter("high", 9)?
            .end_set();
        let q = set.render().unwrap();
        assert_eq!(
            q.sql,
            "SELECT a FROM A a WHERE a.id > :low UNION SELECT b FROM B b WHERE b.id < :high"
        );
        assert!(q.unbound_parameters().is_empty());
        Ok(())
    }
}
