use crate::models::{BarangayGroups, ChildRecord, DashboardView, RiskEntry, StatusKey};
use crate::stats::{aggregate_global, chart_series, compute_risk, group_by_barangay};
use std::fmt::Write;

pub const MAX_ALERTS: usize = 5;
const MISSING: &str = "--";

/// Runs the whole aggregate pipeline over `records` and renders every
/// dashboard region.
pub fn render_dashboard(records: &[ChildRecord]) -> DashboardView {
    let summary = aggregate_global(records);
    let groups = group_by_barangay(records);
    let risk = compute_risk(&groups);

    let mut view = DashboardView {
        charts: chart_series(records, &groups),
        ..DashboardView::default()
    };

    view.text.insert("totalCount", summary.total.to_string());
    view.text.insert("normalCount", summary.normal.to_string());
    view.text.insert("underCount", summary.underweight.to_string());
    view.text.insert("overCount", summary.overweight.to_string());
    view.text.insert("obeseCount", summary.obese.to_string());
    view.text.insert("highestObesity", risk_text(risk.highest_obesity.as_ref()));
    view.text.insert("highestUnderweight", risk_text(risk.highest_underweight.as_ref()));

    view.html.insert("childrenTable", render_rows(records));
    view.html.insert("barangayList", render_barangay_list(&groups));
    view.html.insert("alertsContainer", render_alerts(records));

    view
}

pub fn risk_text(entry: Option<&RiskEntry>) -> String {
    match entry {
        Some(entry) => format!(
            "{} ({:.1}% - {}/{})",
            entry.barangay,
            entry.rate * 100.0,
            entry.count,
            entry.total
        ),
        None => MISSING.to_string(),
    }
}

fn render_rows(records: &[ChildRecord]) -> String {
    if records.is_empty() {
        return r#"<tr><td class="empty" colspan="8">No records yet</td></tr>"#.to_string();
    }

    let mut rows = String::new();
    for record in records {
        let id = escape_html(&record.id);
        let label = if record.status_label.is_empty() {
            record.status_key.label()
        } else {
            record.status_label.as_str()
        };
        let _ = write!(
            rows,
            r#"<tr data-id="{id}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><span class="badge {}">{}</span></td><td><button class="btn edit" data-id="{id}">Edit</button> <button class="btn del" data-id="{id}">Delete</button></td></tr>"#,
            escape_html(&record.name),
            escape_html(&record.barangay),
            optional_number(record.age, ""),
            optional_number(record.weight_kg, ""),
            optional_number(record.height_cm, ""),
            optional_number(record.bmi, MISSING),
            record.status_key.key(),
            escape_html(label),
        );
    }
    rows
}

fn render_barangay_list(groups: &BarangayGroups) -> String {
    if groups.is_empty() {
        return r#"<div class="note">No barangay data yet</div>"#.to_string();
    }

    let mut html = String::new();
    for group in groups.values() {
        let counts = &group.counts;
        let _ = write!(
            html,
            r#"<div class="barangay-item"><h4>{}</h4><p><strong>Total Children:</strong> {}</p><p>Normal: {}</p><p>Underweight: {}</p><p>Overweight: {}</p><p>Obese: {}</p></div>"#,
            escape_html(&group.name),
            counts.total,
            counts.normal,
            counts.underweight,
            counts.overweight,
            counts.obese,
        );
    }
    html
}

fn render_alerts(records: &[ChildRecord]) -> String {
    let flagged: Vec<_> = records
        .iter()
        .filter(|record| record.status_key == StatusKey::Underweight)
        .take(MAX_ALERTS)
        .collect();

    if flagged.is_empty() {
        return r#"<div class="note">No current alerts</div>"#.to_string();
    }

    flagged
        .into_iter()
        .map(|record| {
            format!(
                r#"<div class="alert">&#9888; {} - {} ({})</div>"#,
                escape_html(&record.name),
                escape_html(&record.barangay),
                optional_number(record.bmi, MISSING),
            )
        })
        .collect()
}

fn optional_number(value: Option<f64>, missing: &str) -> String {
    value.map_or_else(|| missing.to_string(), |number| number.to_string())
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Full dashboard page with every region pre-filled from `view`.
pub fn render_index(view: &DashboardView) -> String {
    fill_template(INDEX_HTML, |name| {
        if let Some(text) = view.text.get(name) {
            return Some(escape_html(text));
        }
        view.html.get(name).cloned()
    })
}

/// Replaces `{{NAME}}` placeholders in a single pass, so substituted content
/// is never scanned for further placeholders. Unknown names are left as is.
fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Child Nutrition Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef6ea;
      --bg-2: #c9e4c5;
      --ink: #26312a;
      --accent: #e4572e;
      --accent-2: #2f5d50;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(47, 93, 80, 0.18);
      --underweight: #f2a541;
      --normal: #4caf7d;
      --overweight: #e98a5a;
      --obese: #c8553d;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #f4f9ef 60%, #fbfdf8 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      margin: 0 auto;
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .subtitle {
      margin: 6px 0 0;
      color: #5f6b62;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 93, 80, 0.08);
    }

    .stat .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #7f8a82;
    }

    .stat .value {
      display: block;
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .card {
      background: white;
      border-radius: 20px;
      padding: 20px;
      border: 1px solid rgba(47, 93, 80, 0.08);
      overflow-x: auto;
    }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
      gap: 20px;
    }

    form {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(140px, 1fr));
      gap: 12px;
      align-items: end;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.85rem;
      color: #5f6b62;
    }

    input {
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 93, 80, 0.2);
      font: inherit;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent-2);
      color: white;
    }

    button.del,
    button.danger {
      background: var(--accent);
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      text-align: left;
      padding: 8px 10px;
      border-bottom: 1px solid rgba(47, 93, 80, 0.08);
    }

    .badge {
      padding: 2px 10px;
      border-radius: 999px;
      font-size: 0.85rem;
      background: #eceff1;
    }

    .badge.underweight { background: var(--underweight); color: white; }
    .badge.normal { background: var(--normal); color: white; }
    .badge.overweight { background: var(--overweight); color: white; }
    .badge.obese { background: var(--obese); color: white; }

    .barangay-list {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(180px, 1fr));
      gap: 12px;
    }

    .barangay-item {
      border-radius: 16px;
      padding: 12px 16px;
      background: rgba(47, 93, 80, 0.06);
    }

    .barangay-item h4 {
      margin: 0 0 6px;
    }

    .barangay-item p {
      margin: 2px 0;
    }

    .alert {
      padding: 10px 14px;
      border-radius: 12px;
      background: rgba(242, 165, 65, 0.18);
      margin-bottom: 8px;
    }

    .note,
    .empty {
      color: #7f8a82;
    }

    .risk p {
      margin: 6px 0;
    }

    .status {
      min-height: 1.2em;
      font-size: 0.9rem;
      color: #5f6b62;
    }

    .status[data-type="error"] {
      color: var(--accent);
    }

    svg {
      width: 100%;
      height: auto;
    }

    .chart-label {
      font-size: 11px;
      fill: #7f8a82;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Child Nutrition Dashboard</h1>
      <p class="subtitle">BMI-based nutrition status per child and per barangay.</p>
    </header>

    <section class="panel">
      <div class="stat"><span class="label">Total</span><span class="value" id="totalCount">{{totalCount}}</span></div>
      <div class="stat"><span class="label">Normal</span><span class="value" id="normalCount">{{normalCount}}</span></div>
      <div class="stat"><span class="label">Underweight</span><span class="value" id="underCount">{{underCount}}</span></div>
      <div class="stat"><span class="label">Overweight</span><span class="value" id="overCount">{{overCount}}</span></div>
      <div class="stat"><span class="label">Obese</span><span class="value" id="obeseCount">{{obeseCount}}</span></div>
    </section>

    <section class="card">
      <h2 id="formTitle">Add child</h2>
      <form id="childForm">
        <input type="hidden" id="childId" />
        <label>Name <input id="name" autocomplete="off" /></label>
        <label>Barangay <input id="barangay" autocomplete="off" /></label>
        <label>Age <input id="age" inputmode="decimal" /></label>
        <label>Weight (kg) <input id="weight" inputmode="decimal" /></label>
        <label>Height (cm) <input id="height" inputmode="decimal" /></label>
        <button type="submit" id="saveButton">Save</button>
      </form>
      <p class="status" id="status"></p>
    </section>

    <section class="columns">
      <div class="card risk">
        <h2>Risk highlights</h2>
        <p><strong>Highest obesity:</strong> <span id="highestObesity">{{highestObesity}}</span></p>
        <p><strong>Highest underweight:</strong> <span id="highestUnderweight">{{highestUnderweight}}</span></p>
      </div>
      <div class="card">
        <h2>Alerts</h2>
        <div id="alertsContainer">{{alertsContainer}}</div>
      </div>
    </section>

    <section class="columns">
      <div class="card">
        <h2>Status distribution</h2>
        <svg id="statusChart" viewBox="0 0 400 200" role="img"></svg>
      </div>
      <div class="card">
        <h2>Per barangay</h2>
        <svg id="barangayChart" viewBox="0 0 400 200" role="img"></svg>
      </div>
    </section>

    <section class="card">
      <h2>Barangays</h2>
      <div class="barangay-list" id="barangayList">{{barangayList}}</div>
    </section>

    <section class="card">
      <h2>Children</h2>
      <table>
        <thead>
          <tr><th>Name</th><th>Barangay</th><th>Age</th><th>Weight</th><th>Height</th><th>BMI</th><th>Status</th><th></th></tr>
        </thead>
        <tbody id="childrenTable">{{childrenTable}}</tbody>
      </table>
      <p><button type="button" class="danger" id="clearAll">Clear all data</button></p>
    </section>
  </main>

  <script>
    const STATUSES = ['underweight', 'normal', 'overweight', 'obese'];
    const COLORS = {
      underweight: '#f2a541',
      normal: '#4caf7d',
      overweight: '#e98a5a',
      obese: '#c8553d'
    };

    const statusEl = document.getElementById('status');
    const form = document.getElementById('childForm');
    const formTitle = document.getElementById('formTitle');
    const fields = ['childId', 'name', 'barangay', 'age', 'weight', 'height'].reduce((acc, id) => {
      acc[id] = document.getElementById(id);
      return acc;
    }, {});

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const escapeSvg = (value) => String(value).replace(/[&<>"']/g, (c) => ({
      '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
    }[c]));

    const renderBars = (svg, labels, seriesByStatus) => {
      const width = 400;
      const height = 200;
      const padding = 28;
      if (!labels.length) {
        svg.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
        return;
      }
      const totals = labels.map((_, i) => STATUSES.reduce((sum, s) => sum + seriesByStatus[s][i], 0));
      const max = Math.max(1, ...totals);
      const slot = (width - padding * 2) / labels.length;
      const barWidth = Math.max(6, slot * 0.6);
      let out = '';
      labels.forEach((label, i) => {
        let y = height - padding;
        const x = padding + i * slot + (slot - barWidth) / 2;
        STATUSES.forEach((s) => {
          const h = (seriesByStatus[s][i] / max) * (height - padding * 2);
          if (h > 0) {
            y -= h;
            out += `<rect x="${x.toFixed(1)}" y="${y.toFixed(1)}" width="${barWidth.toFixed(1)}" height="${h.toFixed(1)}" fill="${COLORS[s]}" />`;
          }
        });
        out += `<text class="chart-label" x="${(x + barWidth / 2).toFixed(1)}" y="${height - 10}" text-anchor="middle">${escapeSvg(label)}</text>`;
      });
      svg.innerHTML = out;
    };

    const drawCharts = (charts) => {
      const dist = charts.distribution;
      const single = (s) => STATUSES.map((other) => (other === s ? dist[s] : 0));
      renderBars(
        document.getElementById('statusChart'),
        dist.total ? STATUSES : [],
        STATUSES.reduce((acc, s) => ({ ...acc, [s]: single(s) }), {})
      );
      renderBars(document.getElementById('barangayChart'), charts.labels, charts);
    };

    const send = async (method, url, body) => {
      const res = await fetch(url, {
        method,
        headers: { 'content-type': 'application/json' },
        body: body === undefined ? undefined : JSON.stringify(body)
      });
      const payload = await res.json().catch(() => ({}));
      if (!res.ok) {
        const err = new Error(payload.error || 'Request failed');
        err.status = res.status;
        throw err;
      }
      return payload;
    };

    const resetForm = () => {
      form.reset();
      fields.childId.value = '';
      formTitle.textContent = 'Add child';
    };

    const deleteChild = async (id) => {
      try {
        await send('POST', `/api/children/${encodeURIComponent(id)}/delete`, { confirmed: false });
      } catch (err) {
        if (err.status === 404) {
          alert('Record not found');
          return;
        }
        throw err;
      }
      if (!confirm('Delete this record?')) {
        return;
      }
      await send('POST', `/api/children/${encodeURIComponent(id)}/delete`, { confirmed: true });
      await refresh();
    };

    const editChild = async (id) => {
      const children = await send('GET', '/api/children');
      const child = children.find((c) => String(c.id) === String(id));
      if (!child) {
        alert('Record not found');
        return;
      }
      fields.childId.value = child.id;
      fields.name.value = child.name;
      fields.barangay.value = child.barangay;
      fields.age.value = child.age ?? '';
      fields.weight.value = child.weightKg ?? '';
      fields.height.value = child.heightCm ?? '';
      formTitle.textContent = 'Edit child';
    };

    const bindRowActions = () => {
      document.querySelectorAll('#childrenTable .del').forEach((btn) => {
        btn.onclick = () => deleteChild(btn.dataset.id).catch((err) => setStatus(err.message, 'error'));
      });
      document.querySelectorAll('#childrenTable .edit').forEach((btn) => {
        btn.onclick = () => editChild(btn.dataset.id).catch((err) => setStatus(err.message, 'error'));
      });
    };

    const paint = (view) => {
      Object.entries(view.text).forEach(([id, value]) => {
        const el = document.getElementById(id);
        if (el) el.textContent = value;
      });
      Object.entries(view.html).forEach(([id, value]) => {
        const el = document.getElementById(id);
        if (el) el.innerHTML = value;
      });
      drawCharts(view.charts);
      bindRowActions();
    };

    const refresh = async () => {
      paint(await send('GET', '/api/dashboard'));
    };

    form.addEventListener('submit', (event) => {
      event.preventDefault();
      const body = {
        name: fields.name.value,
        barangay: fields.barangay.value,
        age: fields.age.value,
        weight: fields.weight.value,
        height: fields.height.value
      };
      const id = fields.childId.value;
      const request = id
        ? send('PUT', `/api/children/${encodeURIComponent(id)}`, body)
        : send('POST', '/api/children', body);
      setStatus('Saving...', 'info');
      request
        .then(() => {
          resetForm();
          setStatus('Saved', 'ok');
          setTimeout(() => setStatus('', ''), 1200);
          return refresh();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('clearAll').addEventListener('click', () => {
      if (!confirm('Delete all saved child records?')) {
        return;
      }
      send('POST', '/api/clear', { confirmed: true })
        .then(refresh)
        .catch((err) => setStatus(err.message, 'error'));
    });

    const events = new EventSource('/api/events');
    events.addEventListener('slot-changed', () => {
      refresh().catch((err) => setStatus(err.message, 'error'));
    });

    refresh().catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn child(name: &str, barangay: &str, bmi: Option<f64>, status: StatusKey) -> ChildRecord {
        ChildRecord {
            id: format!("id-{name}"),
            name: name.to_string(),
            barangay: barangay.to_string(),
            age: Some(5.0),
            weight_kg: None,
            height_cm: None,
            bmi,
            status_key: status,
            status_label: status.label().to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn empty_dashboard_shows_defaults() {
        let view = render_dashboard(&[]);
        for region in ["totalCount", "normalCount", "underCount", "overCount", "obeseCount"] {
            assert_eq!(view.text[region], "0");
        }
        assert_eq!(view.text["highestObesity"], "--");
        assert_eq!(view.text["highestUnderweight"], "--");
        assert!(view.html["alertsContainer"].contains("No current alerts"));
        assert!(view.html["childrenTable"].contains("No records yet"));
    }

    #[test]
    fn user_text_is_escaped() {
        let records = vec![child(
            "<script>alert('x')</script>",
            "\"Centro\" & Co",
            Some(15.0),
            StatusKey::Underweight,
        )];
        let view = render_dashboard(&records);

        for region in ["childrenTable", "barangayList", "alertsContainer"] {
            let html = &view.html[region];
            assert!(!html.contains("<script>"), "{region} leaked markup");
            assert!(html.contains("&quot;Centro&quot; &amp; Co"), "{region} missing escaped barangay");
        }
        assert!(view.html["childrenTable"].contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn alerts_are_capped() {
        let records: Vec<_> = (0..8)
            .map(|i| child(&format!("kid{i}"), "Centro", Some(15.0), StatusKey::Underweight))
            .collect();
        let view = render_dashboard(&records);
        assert_eq!(view.html["alertsContainer"].matches("class=\"alert\"").count(), MAX_ALERTS);
        assert!(view.html["alertsContainer"].contains("kid0 - Centro (15)"));
        assert!(!view.html["alertsContainer"].contains("kid5"));
    }

    #[test]
    fn risk_text_formats_rate() {
        let records = vec![
            child("a", "Centro", Some(31.0), StatusKey::Obese),
            child("b", "Centro", Some(22.0), StatusKey::Normal),
            child("c", "Centro", Some(22.5), StatusKey::Normal),
        ];
        let view = render_dashboard(&records);
        assert_eq!(view.text["highestObesity"], "Centro (33.3% - 1/3)");
        assert_eq!(view.text["highestUnderweight"], "Centro (0.0% - 0/3)");
    }

    #[test]
    fn barangay_blocks_are_sorted() {
        let records = vec![
            child("a", "Poblacion", Some(22.0), StatusKey::Normal),
            child("b", "centro", Some(22.0), StatusKey::Normal),
        ];
        let html = &render_dashboard(&records).html["barangayList"];
        let centro = html.find("<h4>centro</h4>").unwrap();
        let poblacion = html.find("<h4>Poblacion</h4>").unwrap();
        assert!(centro < poblacion);
    }

    #[test]
    fn index_embeds_regions_without_rescanning_user_text() {
        let records = vec![child("{{totalCount}}", "Centro", None, StatusKey::Unknown)];
        let page = render_index(&render_dashboard(&records));

        assert!(page.contains(r#"<span class="value" id="totalCount">1</span>"#));
        assert!(page.contains("<td>{{totalCount}}</td>"));
        assert!(!page.contains("{{childrenTable}}"));
    }

    #[test]
    fn fill_template_keeps_unknown_placeholders() {
        let out = fill_template("a {{x}} b {{y}} c {{", |name| (name == "x").then(|| "1".to_string()));
        assert_eq!(out, "a 1 b {{y}} c {{");
    }
}
