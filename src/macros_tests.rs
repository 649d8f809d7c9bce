#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, group_by_all, keyset, partition_by_all, select_all};
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    #[test]
    fn select_and_group_by_accept_mixed_string_sources() -> Result<(), BuildError> {
        let extra = vec!["COUNT(d.id)".to_string()];
        let cb = pg().from("Document", "d")?;
        let cb = select_all!(cb, "d.owner", ["d.kind"], extra)?;
        let cb = group_by_all!(cb, "d.owner", String::from("d.kind"))?;
        assert_eq!(
            cb.render().unwrap().sql,
            "SELECT d.owner, d.kind, COUNT(d.id) FROM Document d GROUP BY d.owner, d.kind"
        );
        Ok(())
    }

    #[test]
    fn partition_by_all_on_window() -> Result<(), BuildError> {
        let window = pg().from("Document", "d")?.window("w")?;
        let cb = partition_by_all!(window, "d.owner", "d.kind")?.end();
        assert_eq!(
            cb.render().unwrap().sql,
            "SELECT d FROM Document d WINDOW w AS (PARTITION BY d.owner, d.kind)"
        );
        Ok(())
    }

    #[test]
    fn keyset_macro_converts_each_value() {
        assert_eq!(
            keyset![1, "a", SqlValue::Null],
            Keyset::new(vec![SqlValue::I64(1), SqlValue::from("a"), SqlValue::Null])
        );
        assert!(keyset![].is_empty());
    }
}
