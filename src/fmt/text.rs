use std::time::Duration;

use console::style;

use crate::domain::ntp::PollReport;
use crate::stats::Stats;

/// RTT truncated to 10 µs, in milliseconds.
pub fn format_rtt(rtt: Duration) -> String {
    let tens_of_micros = rtt.as_micros() / 10;
    format!("{}.{:02} ms", tens_of_micros / 100, tens_of_micros % 100)
}

/// One line per report: target, responder, name, reference, RTT, stratum and
/// version. Failures show the error instead.
pub fn render_report(r: &PollReport, verbose: bool) -> String {
    let res = match &r.outcome {
        Ok(res) => res,
        Err(e) => {
            return format!(
                "{} {} {}",
                style(">").dim(),
                style(&r.target).green().bold(),
                style(format!("error: {}", e)).red()
            );
        }
    };

    let h = &res.header;
    let domain = r.names.first().map(String::as_str).unwrap_or("-");
    let mut out = format!(
        "{arrow} {name} {srv_lbl} {srv_val} {dom_val} {ref_lbl} {ref_val} {rtt_lbl} {rtt_val} {s_lbl} {s_val} {v_lbl} {v_val}",
        arrow = style(">").dim(),
        name = style(&r.target).green().bold(),
        srv_lbl = style("Server:").cyan().bold(),
        srv_val = style(res.responder).green(),
        dom_val = style(format!("({})", domain)).dim(),
        ref_lbl = style("Ref:").cyan().bold(),
        ref_val = h.reference_id_string(),
        rtt_lbl = style("RTT:").cyan().bold(),
        rtt_val = style(format_rtt(res.rtt)).yellow(),
        s_lbl = style("S:").cyan().bold(),
        s_val = h.stratum,
        v_lbl = style("V:").cyan().bold(),
        v_val = h.version,
    );

    if let Some(code) = h.kiss_code() {
        out.push_str(&format!(" {}", style(format!("KoD {}", code)).red().bold()));
    }

    if verbose {
        out.push_str(&format!(
            "\n  {} {}  {} {}  {} {:.3} ms\n  {} {:.3} ms  {} {:.3} ms  {} {}  {} {}",
            style("Leap:").cyan().bold(),
            h.leap,
            style("Mode:").cyan().bold(),
            h.mode,
            style("Offset:").cyan().bold(),
            res.offset_ms(),
            style("Root Delay:").cyan().bold(),
            h.root_delay_secs() * 1000.0,
            style("Root Dispersion:").cyan().bold(),
            h.root_dispersion_secs() * 1000.0,
            style("Poll:").cyan().bold(),
            h.poll,
            style("Precision:").cyan().bold(),
            h.precision,
        ));
    }

    out
}

/// Summary line for one target after a multi-pass run.
pub fn render_stats(name: &str, st: &Stats) -> String {
    if st.count == 0 {
        return format!(
            "{} {} replies, {} failures",
            style(format!("{}:", name)).green().bold(),
            st.count,
            st.failures
        );
    }
    format!(
        "{} {} replies, {} failures, rtt avg {:.3} ms (min: {:.3}, max: {:.3}), offset avg {:.3} ms",
        style(format!("{}:", name)).green().bold(),
        st.count,
        st.failures,
        st.rtt_avg,
        st.rtt_min,
        st.rtt_max,
        st.offset_avg
    )
}
