//! Switch inventory handlers over SQLite
//!
//! Run with: cargo run --example switches -p restsql
//!
//! Walks through what an HTTP front end would do for `/switches/` and
//! `/switches`: bulk POST, GET one, PUT a change, DELETE, GET the list.
//! Set DATABASE_URL / DATABASE_DRIVER to point it elsewhere.

use chrono::{DateTime, Utc};
use restsql::{
    Database, DbConfig, Deleter, Entity, Executor, Getter, Ip, Jsonb, Poster, Putter,
    Rectangle, Report, Result, Search, element_key,
};
use serde::{Deserialize, Serialize};

const TABLE: &str = "switches";

/// A single switch. Every field is optional so a PUT can carry just the
/// fields it changes.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Entity)]
#[serde(rename_all = "PascalCase")]
pub struct Switch {
    pub sysname: Option<String>,
    #[orm(column = "mgmt_v4_addr")]
    #[serde(rename = "MgmtIP4")]
    pub mgmt_ip4: Option<Ip>,
    #[orm(column = "mgmt_v6_addr")]
    #[serde(rename = "MgmtIP6")]
    pub mgmt_ip6: Option<Ip>,
    #[orm(column = "last_updated")]
    pub last_updated: Option<DateTime<Utc>>,
    #[orm(column = "poll_frequency")]
    pub poll_frequency: Option<String>,
    pub locked: Option<bool>,
    pub deleted: Option<bool>,
    #[orm(column = "distro_name")]
    pub distro_name: Option<String>,
    #[orm(column = "distro_phy_port")]
    pub distro_phy_port: Option<String>,
    pub tags: Option<Jsonb>,
    pub community: Option<String>,
    #[orm(column = "traffic_vlan")]
    pub traffic_vlan: Option<i32>,
    #[orm(column = "mgmt_vlan")]
    pub mgmt_vlan: Option<i32>,
    pub placement: Option<Rectangle>,
}

/// The collection behind `/switches`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Switches(pub Vec<Switch>);

fn by_name(name: &str) -> Result<Search> {
    Search::new().eq("sysname", name)
}

impl Getter for Switch {
    async fn get<C: Executor>(&mut self, db: &C, element: &str) -> Result<()> {
        let name = element_key(element, None)?;
        restsql::get(db, self, TABLE, &by_name(name)?).await
    }
}

impl Putter for Switch {
    async fn put<C: Executor>(&self, db: &C, element: &str) -> Result<Report> {
        let name = element_key(element, self.sysname.as_deref())?;
        let row = Switch {
            sysname: Some(name.to_string()),
            ..self.clone()
        };
        restsql::upsert(db, &row, TABLE, &by_name(name)?).await
    }
}

impl Poster for Switch {
    async fn post<C: Executor>(&self, db: &C) -> Result<Report> {
        self.put(db, "").await
    }
}

impl Deleter for Switch {
    async fn delete<C: Executor>(&self, db: &C, element: &str) -> Result<Report> {
        let name = element_key(element, None)?;
        restsql::delete(db, TABLE, &by_name(name)?).await
    }
}

impl Getter for Switches {
    async fn get<C: Executor>(&mut self, db: &C, _element: &str) -> Result<()> {
        restsql::select_many(db, &mut self.0, TABLE, &Search::all()).await
    }
}

impl Poster for Switches {
    async fn post<C: Executor>(&self, db: &C) -> Result<Report> {
        Ok(restsql::upsert_each(db, &self.0, TABLE, |sw: &Switch| {
            by_name(element_key("", sw.sysname.as_deref())?)
        })
        .await)
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS switches (
    sysname TEXT PRIMARY KEY,
    mgmt_v4_addr TEXT,
    mgmt_v6_addr TEXT,
    last_updated TEXT,
    poll_frequency TEXT,
    locked INTEGER DEFAULT 0,
    deleted INTEGER DEFAULT 0,
    distro_name TEXT,
    distro_phy_port TEXT,
    tags TEXT,
    community TEXT DEFAULT 'public',
    traffic_vlan INTEGER,
    mgmt_vlan INTEGER,
    placement TEXT
)";

const BULK: &str = r#"[
    {"Sysname": "e1-1", "MgmtIP4": "10.1.0.11/24", "MgmtVlan": 101, "DistroName": "distro0",
     "Tags": ["edge"], "Placement": {"X1": 10, "Y1": 10, "X2": 30, "Y2": 20}},
    {"Sysname": "e1-3", "MgmtIP4": "10.1.0.13", "MgmtVlan": 101, "DistroName": "distro0"},
    {"MgmtVlan": 7}
]"#;

type BoxError = Box<dyn std::error::Error>;

fn show(what: &str, report: &Report) -> std::result::Result<(), BoxError> {
    let body = serde_json::to_string(report)?;
    println!("{what}: {} {body}", report.code());
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), BoxError> {
    dotenvy::dotenv().ok();

    let config = match std::env::var("DATABASE_URL") {
        Ok(_) => DbConfig::from_env()?,
        Err(_) => DbConfig::sqlite_memory(),
    };
    let db = Database::open(config).await?;
    db.execute(SCHEMA, &[]).await?;

    // POST /switches: the third entry has no name and is counted as failed.
    let bulk: Switches = serde_json::from_str(BULK)?;
    show("POST /switches", &Report::from_result(bulk.post(&db).await))?;

    // GET /switches/e1-3
    let mut sw = Switch::default();
    sw.get(&db, "e1-3").await?;
    println!("GET /switches/e1-3: {sw:?}");

    // PUT /switches/e1-3 with only the fields that change.
    let patch = Switch {
        mgmt_vlan: Some(42),
        locked: Some(true),
        ..Switch::default()
    };
    show("PUT /switches/e1-3", &Report::from_result(patch.put(&db, "e1-3").await))?;

    // PUT with a body naming a different switch than the path.
    let wrong = Switch {
        sysname: Some("e1-4".into()),
        ..Switch::default()
    };
    show("PUT /switches/e1-3", &Report::from_result(wrong.put(&db, "e1-3").await))?;

    // DELETE /switches/e1-1, twice.
    for _ in 0..2 {
        show(
            "DELETE /switches/e1-1",
            &Report::from_result(Switch::default().delete(&db, "e1-1").await),
        )?;
    }

    // GET /switches
    let mut all = Switches::default();
    all.get(&db, "").await?;
    let body = serde_json::to_string_pretty(&all)?;
    println!("GET /switches:\n{body}");

    // GET /switches/e1-1 is gone now.
    if let Err(err) = Switch::default().get(&db, "e1-1").await {
        println!("GET /switches/e1-1: {} {err}", err.code());
    }

    db.close();
    Ok(())
}
