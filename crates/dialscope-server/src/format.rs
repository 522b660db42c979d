//! Response body rendering for the HTTP surface.
//!
//! Every composed field is labeled explicitly in both modes: membership
//! flags render as `yes`/`no` even while their table is unloaded, record
//! fields render as `null` when the table is unavailable or the row is
//! absent.

use std::fmt::Write;

use serde_json::{Value, json};

use dialscope_core::BatchReply;
use dialscope_core::phone::NONE;
use dialscope_core::tables::failure::FailureRecord;
use dialscope_core::tables::ftc::FtcRecord;
use dialscope_core::tables::geo::GeoRecord;
use dialscope_core::tables::lerg::LergRecord;
use dialscope_core::tables::lrn::LrnTable;
use dialscope_core::tables::youmail::YoumailRecord;

/// Render a `/target` reply as a JSON array, one object per phone.
pub fn target_json(reply: &BatchReply) -> String {
    let rows: Vec<Value> = (0..reply.len()).map(|i| target_row_json(reply, i)).collect();
    let mut body = serde_json::to_string_pretty(&Value::Array(rows)).unwrap_or_else(|_| "[]".into());
    body.push('\n');
    body
}

/// Render a `/target` reply as plain text, one braced record per line.
pub fn target_text(reply: &BatchReply) -> String {
    let mut out = String::new();
    for i in 0..reply.len() {
        out.push('{');
        let rn = reply.effective_rn(i);
        if rn != NONE {
            let _ = write!(out, "pn={},lrn={}", reply.pns[i], rn);
        } else {
            let _ = write!(out, "pn={},lrn=null", reply.pns[i]);
        }
        for (name, value) in target_fields(reply, i) {
            let _ = write!(out, ", {name}={}", value.unwrap_or_else(|| "null".into()));
        }
        out.push_str("}\n");
    }
    out
}

fn target_row_json(reply: &BatchReply, i: usize) -> Value {
    let rn = reply.effective_rn(i);
    let mut row = serde_json::Map::new();
    row.insert("pn".into(), json!(reply.pns[i].to_string()));
    row.insert(
        "rn".into(),
        if rn != NONE {
            json!(rn.to_string())
        } else {
            Value::Null
        },
    );
    for (name, value) in target_fields(reply, i) {
        row.insert(name.into(), value.map_or(Value::Null, Value::String));
    }
    Value::Object(row)
}

/// The composed fields after `pn`/`rn`, in emission order. `None` renders
/// as null; the membership and FTC flags are always concrete strings.
fn target_fields(reply: &BatchReply, i: usize) -> Vec<(&'static str, Option<String>)> {
    let lerg = present(&reply.lerg, i, LergRecord::is_absent);
    let youmail = present(&reply.youmail, i, YoumailRecord::is_absent);
    let geo = present(&reply.geo, i, GeoRecord::is_absent);
    let ftc = present(&reply.ftc, i, FtcRecord::is_absent);
    let f404 = present(&reply.f404, i, FailureRecord::is_absent);
    let f606 = present(&reply.f606, i, FailureRecord::is_absent);

    vec![
        ("is_dno", Some(yes_no(flag(&reply.dno, i)).into())),
        ("is_dnc", Some(yes_no(flag(&reply.dnc, i)).into())),
        ("is_tollfree", Some(yes_no(flag(&reply.tollfree, i)).into())),
        ("ocn", lerg.map(|r| r.ocn.clone())),
        ("operator", lerg.map(|r| r.company.clone())),
        ("ocn_type", lerg.map(|r| r.ocn_type.clone())),
        ("lata", lerg.map(|r| r.lata.clone())),
        ("rate_center", lerg.map(|r| r.rate_center.clone())),
        ("country", lerg.map(|r| r.country.clone())),
        ("youmail_spam_score", youmail.map(|r| r.spam_score.clone())),
        (
            "youmail_fraud_probability",
            youmail.map(|r| r.fraud_probability.clone()),
        ),
        ("youmail_unlawful", youmail.map(|r| r.unlawful.clone())),
        ("youmail_tcpa_fraud", youmail.map(|r| r.tcpa_fraud.clone())),
        ("zipcode", geo.map(|r| r.zipcode.clone())),
        ("county", geo.map(|r| r.county.clone())),
        ("city", geo.map(|r| r.city.clone())),
        ("latitude", geo.map(|r| r.latitude.clone())),
        ("longitude", geo.map(|r| r.longitude.clone())),
        ("timezone", geo.map(|r| r.timezone.clone())),
        ("is_ftc", Some(yes_no(ftc.is_some()).into())),
        ("first_ftc_on", ftc.map(|r| r.first_complaint.clone())),
        ("last_ftc_on", ftc.map(|r| r.last_complaint.clone())),
        ("ftc_count", ftc.map(|r| r.count.clone())),
        ("first_404_on", f404.map(|r| r.first_seen.clone())),
        ("last_404_on", f404.map(|r| r.last_seen.clone())),
        ("first_6xx_on", f606.map(|r| r.first_seen.clone())),
        ("last_6xx_on", f606.map(|r| r.last_seen.clone())),
    ]
}

fn flag(column: &Option<Vec<u64>>, i: usize) -> bool {
    column.as_ref().is_some_and(|v| v[i] != 0)
}

fn yes_no(hit: bool) -> &'static str {
    if hit { "yes" } else { "no" }
}

fn present<'a, T>(
    column: &'a Option<Vec<T>>,
    i: usize,
    is_absent: impl Fn(&T) -> bool,
) -> Option<&'a T> {
    column.as_ref().map(|v| &v[i]).filter(|r| !is_absent(r))
}

/// Render a `/reverse` reply: every `(pn, rn)` pair of the US then the CA
/// table, per requested interval.
pub fn reverse_body(
    us: Option<&LrnTable>,
    ca: Option<&LrnTable>,
    ranges: &[(u64, u64)],
    json: bool,
) -> String {
    let mut pairs = Vec::new();
    for &(lo, hi) in ranges {
        if let Some(table) = us {
            pairs.extend(table.inverse_rns(lo, hi));
        }
        if let Some(table) = ca {
            pairs.extend(table.inverse_rns(lo, hi));
        }
    }

    if json {
        let rows: Vec<Value> = pairs
            .iter()
            .map(|&(pn, rn)| json!({ "pn": pn.to_string(), "rn": rn.to_string() }))
            .collect();
        let mut body =
            serde_json::to_string_pretty(&Value::Array(rows)).unwrap_or_else(|_| "[]".into());
        body.push('\n');
        body
    } else {
        let mut body = String::new();
        for (pn, rn) in pairs {
            let _ = writeln!(body, "{pn},{rn}");
        }
        body
    }
}
