//! Mapper behaviour against an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "derive"))]

use chrono::{DateTime, TimeZone, Utc};
use restsql::{
    Database, DbConfig, Dialect, Entity, Error, Executor, Ip, Jsonb, Rectangle, Result, Row,
    Search, Value,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Barrier;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Switch {
    pub sysname: Option<String>,
    #[orm(column = "mgmt_v4_addr")]
    pub mgmt_v4: Option<Ip>,
    #[orm(column = "mgmt_vlan")]
    pub vlan: Option<i32>,
    pub tags: Option<Jsonb>,
    pub placement: Option<Rectangle>,
    #[orm(column = "last_updated")]
    pub updated: Option<DateTime<Utc>>,
    #[orm(skip)]
    pub note: String,
}

#[derive(Debug, Default, Entity)]
pub struct SwitchName {
    pub sysname: String,
}

async fn setup() -> Database {
    let db = Database::open(DbConfig::sqlite_memory()).await.unwrap();
    db.execute(
        "CREATE TABLE switches (
            sysname TEXT PRIMARY KEY,
            mgmt_v4_addr TEXT,
            mgmt_vlan INTEGER,
            tags TEXT,
            placement TEXT,
            last_updated TEXT
        )",
        &[],
    )
    .await
    .unwrap();
    db
}

fn by_name(name: &str) -> Search {
    Search::new().eq("sysname", name).unwrap()
}

fn e1_3() -> Switch {
    Switch {
        sysname: Some("e1-3".into()),
        mgmt_v4: Some("10.0.0.13".parse().unwrap()),
        vlan: Some(1),
        tags: Some(Jsonb(serde_json::json!({"role": "edge", "ports": 48}))),
        placement: Some(Rectangle::new(10, 20, 30, 40)),
        updated: Some(Utc.with_ymd_and_hms(2020, 4, 1, 12, 0, 0).unwrap()),
        note: String::new(),
    }
}

#[tokio::test]
async fn insert_then_get_round_trips() {
    let db = setup().await;
    let sw = e1_3();
    let report = restsql::insert(&db, &sw, "switches").await.unwrap();
    assert_eq!(report.affected, 1);
    assert_eq!(report.ok, 1);

    let mut got = Switch {
        note: "local".into(),
        ..Switch::default()
    };
    restsql::get(&db, &mut got, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert_eq!(got.note, "local");
    assert_eq!(Switch { note: String::new(), ..got }, sw);
}

#[tokio::test]
async fn e1_3_scenario() {
    let db = setup().await;
    let mut sw = Switch {
        sysname: Some("e1-3".into()),
        vlan: Some(1),
        ..Switch::default()
    };
    restsql::insert(&db, &sw, "switches").await.unwrap();

    let mut found = Switch::default();
    assert!(
        restsql::select(&db, &mut found, "switches", &by_name("e1-3"))
            .await
            .unwrap()
    );
    assert_eq!(found.vlan, Some(1));

    sw.vlan = Some(42);
    let report = restsql::update(&db, &sw, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert_eq!(report.affected, 1);

    let mut again = Switch::default();
    restsql::get(&db, &mut again, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert_eq!(again.vlan, Some(42));
}

#[tokio::test]
async fn partial_update_leaves_absent_columns_alone() {
    let db = setup().await;
    restsql::insert(&db, &e1_3(), "switches").await.unwrap();

    let patch = Switch {
        vlan: Some(0),
        ..Switch::default()
    };
    restsql::update(&db, &patch, "switches", &by_name("e1-3"))
        .await
        .unwrap();

    let mut got = Switch::default();
    restsql::get(&db, &mut got, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert_eq!(got.vlan, Some(0));
    assert_eq!(got.mgmt_v4, e1_3().mgmt_v4);
    assert_eq!(got.tags, e1_3().tags);
    assert_eq!(got.placement, e1_3().placement);
}

#[tokio::test]
async fn missing_row_and_bad_column_are_different_failures() {
    let db = setup().await;
    restsql::insert(&db, &e1_3(), "switches").await.unwrap();

    let mut sw = Switch::default();
    let err = restsql::get(&db, &mut sw, "switches", &by_name("e9-9"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), 404);
    assert_eq!(sw, Switch::default());

    let bad = Search::new().eq("no_such_column", "x").unwrap();
    let err = restsql::get(&db, &mut sw, "switches", &bad)
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert_eq!(err.code(), 500);

    let quoted = Search::new().eq("\"no_such_column\"", "x").unwrap();
    let err = restsql::get(&db, &mut sw, "switches", &quoted)
        .await
        .unwrap_err();
    assert!(err.is_storage(), "{err}");
}

#[tokio::test]
async fn select_reports_absence_without_touching_dest() {
    let db = setup().await;
    let mut sw = e1_3();
    let found = restsql::select(&db, &mut sw, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert!(!found);
    assert_eq!(sw, e1_3());
}

#[tokio::test]
async fn upsert_inserts_then_updates() {
    let db = setup().await;
    let mut sw = e1_3();
    let key = by_name("e1-3");

    restsql::upsert(&db, &sw, "switches", &key).await.unwrap();
    assert!(restsql::exists(&db, "switches", &key).await.unwrap());

    sw.vlan = Some(7);
    let report = restsql::upsert(&db, &sw, "switches", &key).await.unwrap();
    assert_eq!(report.affected, 1);

    let mut all: Vec<Switch> = Vec::new();
    restsql::select_many(&db, &mut all, "switches", &Search::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].vlan, Some(7));
}

/// Executor that parks every existence probe until two callers have made one.
struct ProbeGate<'a> {
    db: &'a Database,
    barrier: Arc<Barrier>,
}

impl Executor for ProbeGate<'_> {
    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = self.db.query(sql, params).await?;
        if sql.starts_with("SELECT 1 FROM") {
            self.barrier.wait().await;
        }
        Ok(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.db.execute(sql, params).await
    }
}

#[tokio::test]
async fn racing_upserts_let_one_insert_fail() {
    let db = setup().await;
    let gate = ProbeGate {
        db: &db,
        barrier: Arc::new(Barrier::new(2)),
    };
    let key = by_name("e1-3");
    let first = e1_3();
    let second = Switch {
        vlan: Some(2),
        ..e1_3()
    };

    let (a, b) = tokio::join!(
        restsql::upsert(&gate, &first, "switches", &key),
        restsql::upsert(&gate, &second, "switches", &key),
    );
    let results = [a, b];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    let err = results
        .into_iter()
        .find_map(|r| r.err())
        .unwrap();
    assert!(err.is_storage());
    assert!(err.is_unique_violation());
}

/// Executor whose existence probes always fail.
struct BrokenProbe<'a>(&'a Database);

impl Executor for BrokenProbe<'_> {
    fn dialect(&self) -> Dialect {
        self.0.dialect()
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if sql.starts_with("SELECT 1 FROM") {
            return Err(restsql::StorageError::Connection("probe lost".into()).into());
        }
        self.0.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.0.execute(sql, params).await
    }
}

#[tokio::test]
async fn failed_probe_does_not_fall_through_to_insert() {
    let db = setup().await;
    let err = restsql::upsert(&BrokenProbe(&db), &e1_3(), "switches", &by_name("e1-3"))
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert!(!restsql::exists(&db, "switches", &by_name("e1-3")).await.unwrap());
}

#[tokio::test]
async fn select_many_with_no_rows_empties_dest() {
    let db = setup().await;
    let mut dest = vec![e1_3(), e1_3()];
    restsql::select_many(&db, &mut dest, "switches", &Search::all())
        .await
        .unwrap();
    assert!(dest.is_empty());
}

#[tokio::test]
async fn select_many_keeps_dest_on_error() {
    let db = setup().await;
    let mut dest = vec![e1_3()];
    let err = restsql::select_many(&db, &mut dest, "no_such_table", &Search::all())
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert_eq!(dest.len(), 1);
}

#[tokio::test]
async fn select_many_fills_boxed_elements() {
    let db = setup().await;
    for name in ["e1-1", "e1-2", "e2-1"] {
        let sw = Switch {
            sysname: Some(name.into()),
            ..Switch::default()
        };
        restsql::insert(&db, &sw, "switches").await.unwrap();
    }

    let mut dest: Vec<Box<Switch>> = Vec::new();
    let search = Search::new().like("sysname", "e1-%").unwrap();
    restsql::select_many(&db, &mut dest, "switches", &search)
        .await
        .unwrap();
    let mut names: Vec<_> = dest.iter().filter_map(|s| s.sysname.clone()).collect();
    names.sort();
    assert_eq!(names, ["e1-1", "e1-2"]);
    assert!(dest.iter().all(|s| s.vlan.is_none()));
}

#[tokio::test]
async fn null_into_required_field_is_a_decode_error() {
    let db = setup().await;
    db.execute("INSERT INTO switches (mgmt_vlan) VALUES (3)", &[])
        .await
        .unwrap();
    let mut dest: Vec<SwitchName> = Vec::new();
    let err = restsql::select_many(&db, &mut dest, "switches", &Search::all())
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::Decode { column, .. } if column == "sysname"));
}

#[tokio::test]
async fn delete_removes_matching_rows_only() {
    let db = setup().await;
    restsql::insert(&db, &e1_3(), "switches").await.unwrap();

    let report = restsql::delete(&db, "switches", &by_name("e9-9"))
        .await
        .unwrap();
    assert_eq!(report.affected, 0);
    assert!(report.is_ok());

    let report = restsql::delete(&db, "switches", &by_name("e1-3"))
        .await
        .unwrap();
    assert_eq!(report.affected, 1);
    assert!(!restsql::exists(&db, "switches", &by_name("e1-3")).await.unwrap());
}

#[tokio::test]
async fn unkeyed_writes_are_refused() {
    let db = setup().await;
    let err = restsql::delete(&db, "switches", &Search::all())
        .await
        .unwrap_err();
    assert_eq!(err.code(), 400);
    let err = restsql::update(&db, &e1_3(), "switches", &Search::all())
        .await
        .unwrap_err();
    assert_eq!(err.code(), 400);
}

#[tokio::test]
async fn hostile_table_names_never_reach_the_database() {
    let db = setup().await;
    let err = restsql::insert(&db, &e1_3(), "switches; DROP TABLE switches")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTarget(_)));
    assert!(restsql::exists(&db, "switches", &Search::all()).await.is_ok());
}

#[tokio::test]
async fn upsert_each_counts_failures_and_continues() {
    let db = setup().await;
    let items = vec![
        e1_3(),
        Switch::default(),
        Switch {
            sysname: Some("e2-1".into()),
            ..Switch::default()
        },
    ];
    let report = restsql::upsert_each(&db, &items, "switches", |sw: &Switch| {
        let name = sw
            .sysname
            .as_deref()
            .ok_or_else(|| Error::malformed_predicate("sysname is required"))?;
        Search::new().eq("sysname", name)
    })
    .await;
    assert_eq!(report.ok, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.affected, 2);
    assert_eq!(report.code(), 400);
}

#[tokio::test]
async fn statement_timeout_interrupts_long_queries() {
    let config = DbConfig::sqlite_memory().statement_timeout(Duration::from_millis(50));
    let db = Database::open(config).await.unwrap();
    let start = Instant::now();
    let err = db
        .query(
            "WITH RECURSIVE c(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM c WHERE n < 100000000) \
             SELECT max(n) FROM c",
            &[],
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert_eq!(err.code(), 500);
    assert!(start.elapsed() < Duration::from_secs(5));

    let rows = db.query("SELECT 1", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn closed_database_refuses_statements() {
    let db = setup().await;
    db.close();
    let mut sw = Switch::default();
    let err = restsql::get(&db, &mut sw, "switches", &by_name("e1-3"))
        .await
        .unwrap_err();
    assert!(err.is_not_connected());
}
