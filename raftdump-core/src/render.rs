//! Line rendering.
//!
//! Every line starts with the term and index columns followed by a short
//! entry type tag and the category-specific data.

use crate::filter::EntryView;
use chrono::{TimeZone, Utc};
use raftdump_protocol::{Entry, Request, METHOD_DELETE, METHOD_QGET, METHOD_SYNC};

const PATH_PREFIX: usize = 64;
const PATH_SUFFIX: usize = 64;
const VALUE_PREFIX: usize = 128;
const VALUE_SUFFIX: usize = 0;

/// Quotes `s`, keeping only its first `pre` and last `suf` characters when
/// it is longer than both together.
pub fn excerpt(s: &str, pre: usize, suf: usize) -> String {
    let len = s.chars().count();
    if len <= pre + suf {
        return format!("{:?}", s);
    }

    let head: String = s.chars().take(pre).collect();
    let tail: String = s.chars().skip(len - suf).collect();
    format!("{:?}...{:?}", head, tail)
}

/// Column header line.
pub fn header(with_decoder: bool) -> String {
    let mut line = format!("{:>4}\t{:>10}\ttype\tdata", "term", "index");
    if with_decoder {
        line.push_str("\tdecoder_status\tdecoded_data");
    }
    line
}

/// Renders one classified entry, without a trailing newline.
pub fn render_entry(entry: &Entry, view: &EntryView) -> String {
    let columns = format!("{:>4}\t{:>10}", entry.term, entry.index);
    let data = match view {
        EntryView::ConfChange(Some(cc)) => {
            format!("conf\tmethod={} id={}", cc.change_type, cc.node_id)
        }
        EntryView::ConfChange(None) => "conf\t???".to_string(),
        EntryView::InternalRaftRequest { request, .. } => format!("norm\t{}", request),
        EntryView::Request(req) => format!("norm\t{}", legacy_request(req)),
        EntryView::UnknownNormal => "norm\t???".to_string(),
    };
    format!("{}\t{}", columns, data)
}

fn legacy_request(req: &Request) -> String {
    match req.method.as_str() {
        "" => "noop".to_string(),
        METHOD_SYNC => format!("method=SYNC time={:?}", sync_time(req.time)),
        METHOD_QGET | METHOD_DELETE => format!(
            "method={} path={}",
            req.method,
            excerpt(&req.path, PATH_PREFIX, PATH_SUFFIX)
        ),
        method => format!(
            "method={} path={} val={}",
            method,
            excerpt(&req.path, PATH_PREFIX, PATH_SUFFIX),
            excerpt(&req.val, VALUE_PREFIX, VALUE_SUFFIX)
        ),
    }
}

fn sync_time(nanos: i64) -> String {
    let time = Utc.timestamp_nanos(nanos);
    let mut out = time.format("%Y-%m-%d %H:%M:%S").to_string();

    // fractional seconds carry no trailing zeros
    let frac = time.timestamp_subsec_nanos();
    if frac > 0 {
        out.push('.');
        out.push_str(format!("{:09}", frac).trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}
