#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, ClauseType, Expr, ParameterType, RenderedQuery};
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    fn rendered(cb: &CriteriaBuilder) -> RenderedQuery {
        cb.render().unwrap()
    }

    #[test]
    fn simple_where_and_order_by() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select("d.name")?
            .where_("d.age")?
            .gt(18)
            .order_by_asc("d.id")?;

        let q = rendered(&cb);
        assert_eq!(
            q.sql,
            "SELECT d.name FROM Document d WHERE d.age > :param_0 ORDER BY d.id ASC NULLS LAST"
        );
        assert_eq!(q.bindings.get("param_0"), Some(&SqlValue::I64(18)));
        assert_eq!(q.parameter_types, vec![("param_0".to_string(), ParameterType::Integer)]);
        Ok(())
    }

    #[test]
    fn every_restriction_operator_returns_to_parent() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.name")?
            .like()
            .value("A%")
            .escape('!')
            .where_("d.age")?
            .between(1)
            .and(10)
            .where_("d.owner.name")?
            .not_in(Vec::<i64>::new())
            .where_("d.id")?
            .in_([1, 2])
            .where_("d.deleted")?
            .is_null()
            .where_("d.tags")?
            .is_not_empty()
            .where_("d.title")?
            .not_like_case_insensitive()
            .value("x")
            .no_escape();

        let q = rendered(&cb);
        assert_eq!(
            q.sql,
            "SELECT d FROM Document d WHERE d.name LIKE :param_0 ESCAPE :param_1 \
             AND d.age BETWEEN :param_2 AND :param_3 \
             AND 1 = 1 \
             AND d.id IN (:param_4, :param_5) \
             AND d.deleted IS NULL \
             AND d.tags IS NOT EMPTY \
             AND UPPER(d.title) NOT LIKE UPPER(:param_6)"
        );
        assert_eq!(q.bindings.get("param_1"), Some(&SqlValue::from("!")));
        assert_eq!(q.bindings.len(), 7);
        Ok(())
    }

    #[test]
    fn empty_in_list_is_always_false() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.id")?
            .in_(Vec::<i64>::new());
        assert_eq!(rendered(&cb).sql, "SELECT d FROM Document d WHERE 1 = 0");
        Ok(())
    }

    #[test]
    fn member_of_and_expression_operands() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.owner")?
            .is_member_of("d.contacts")?
            .where_("d.age")?
            .le_expression("d.owner.age")?
            .where_("d.created")?
            .between_expression("d.owner.created")?
            .and_expression("d.owner.updated")?;
        assert_eq!(
            rendered(&cb).sql,
            "SELECT d FROM Document d WHERE d.owner MEMBER OF d.contacts \
             AND d.age <= d.owner.age \
             AND d.created BETWEEN d.owner.created AND d.owner.updated"
        );
        Ok(())
    }

    #[test]
    fn empty_connectives_render_identity() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_and()
            .end_and()
            .where_or()
            .end_or();
        assert_eq!(rendered(&cb).sql, "SELECT d FROM Document d WHERE 1 = 1 AND 1 = 0");
        Ok(())
    }

    #[test]
    fn nested_groups_are_parenthesized() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.id")?
            .eq(1)
            .where_or()
            .where_("d.age")?
            .lt(5)
            .where_and()
            .where_("d.age")?
            .gt(10)
            .where_("d.name")?
            .is_not_null()
            .end_and()
            .end_or();
        assert_eq!(
            rendered(&cb).sql,
            "SELECT d FROM Document d WHERE d.id = :param_0 \
             AND (d.age < :param_1 OR (d.age > :param_2 AND d.name IS NOT NULL))"
        );
        Ok(())
    }

    #[test]
    fn where_not_negates_the_whole_group() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_not()
            .where_("d.age")?
            .gt(1)
            .where_("d.name")?
            .eq("x")
            .end_and();
        assert_eq!(
            rendered(&cb).sql,
            "SELECT d FROM Document d WHERE NOT (d.age > :param_0 AND d.name = :param_1)"
        );
        Ok(())
    }

    #[test]
    fn negated_operators_match_negated_predicates() -> Result<(), BuildError> {
        let between = pg().from("Document", "d")?.where_("d.age")?.between(1).and(2);
        let not_between = pg().from("Document", "d")?.where_("d.age")?.not_between(1).and(2);
        assert_eq!(
            not_between.model().where_clause[0],
            between.model().where_clause[0].clone().negated()
        );
        assert_eq!(
            rendered(&not_between).sql,
            "SELECT d FROM Document d WHERE d.age NOT BETWEEN :param_0 AND :param_1"
        );

        let null = pg().from("Document", "d")?.where_("d.age")?.is_null();
        let not_null = pg().from("Document", "d")?.where_("d.age")?.is_not_null();
        assert_eq!(
            not_null.model().where_clause[0],
            null.model().where_clause[0].clone().negated()
        );
        Ok(())
    }

    #[test]
    fn explicit_parameters_keep_their_names() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.age")?
            .gt_expression(":minAge")?
            .set_parameter("minAge", 18)?;

        let q = rendered(&cb);
        assert_eq!(q.sql, "SELECT d FROM Document d WHERE d.age > :minAge");
        assert_eq!(q.bindings.get("minAge"), Some(&SqlValue::I64(18)));
        assert_eq!(q.parameter_types, vec![("minAge".to_string(), ParameterType::Integer)]);
        assert!(q.unbound_parameters().is_empty());
        Ok(())
    }

    #[test]
    fn unbound_parameters_are_reported() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.age")?
            .gt_expression(":minAge")?
            .set_parameter_type("minAge", ParameterType::Integer)?;

        let q = rendered(&cb);
        assert_eq!(q.unbound_parameters(), vec!["minAge"]);
        assert_eq!(q.parameter_types, vec![("minAge".to_string(), ParameterType::Integer)]);
        Ok(())
    }

    #[test]
    fn having_and_group_by() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select("d.owner")?
            .select_as("COUNT(d.id)", "cnt")?
            .group_by("d.owner")?
            .having("COUNT(d.id)")?
            .ge(2)
            .having_or()
            .having("d.owner.age")?
            .lt(18)
            .having("d.owner.age")?
            .gt(65)
            .end_or();
        assert_eq!(
            rendered(&cb).sql,
            "SELECT d.owner, COUNT(d.id) AS cnt FROM Document d GROUP BY d.owner \
             HAVING COUNT(d.id) >= :param_0 AND (d.owner.age < :param_1 OR d.owner.age > :param_2)"
        );
        Ok(())
    }

    #[test]
    fn join_on_conditions() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .entity_join_on("Person", "p", JoinType::Inner)?
            .on("p.id")?
            .eq_expression("d.owner.id")?
            .on("p.age")?
            .gt(18)
            .end()?
            .select("p.name")?
            .where_("d.age")?
            .lt(3);
        assert_eq!(
            rendered(&cb).sql,
            "SELECT p.name FROM Document d JOIN Person p ON p.id = d.owner.id AND p.age > :param_0 \
             WHERE d.age < :param_1"
        );
        Ok(())
    }

    #[test]
    fn join_on_or_group() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .left_join_on("d.owner", "o")?
            .on_or()
            .on("o.age")?
            .lt(18)
            .on("o.age")?
            .gt(65)
            .end_or()
            .end()?;
        assert_eq!(
            rendered(&cb).sql,
            "SELECT d FROM Document d LEFT JOIN d.owner o ON o.age < :param_0 OR o.age > :param_1"
        );
        Ok(())
    }

    #[test]
    fn empty_arguments_fail_at_the_call() {
        let err = pg().from("", "d").unwrap_err();
        assert_eq!(
            err,
            BuildError::EmptyArgument {
                clause: ClauseType::From,
                argument: "entity",
            }
        );
        assert!(matches!(
            pg().from("Document", "d").unwrap().select("  "),
            Err(BuildError::EmptyArgument { .. })
        ));
    }

    #[test]
    fn unparsable_expression_is_a_build_error() -> Result<(), BuildError> {
        let res = pg().from("Document", "d")?.where_("COUNT(d.age");
        assert!(matches!(res, Err(BuildError::Parse { clause: ClauseType::Where, .. })));
        Ok(())
    }

    #[test]
    fn where_predicate_accepts_prebuilt_expressions() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_predicate(Expr::raw("d.flags & 4 = 0"));
        assert_eq!(rendered(&cb).sql, "SELECT d FROM Document d WHERE d.flags & 4 = 0");
        Ok(())
    }

    #[test]
    fn builders_render_repeatedly() -> Result<(), BuildError> {
        let cb = pg().from("Document", "d")?.where_("d.age")?.gt(1);
        assert_eq!(rendered(&cb), rendered(&cb));
        Ok(())
    }
}
