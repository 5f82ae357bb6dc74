//! Self-contained HTML dashboard with filtering, sorting and inline editing

use std::collections::BTreeMap;

use super::link_target;
use crate::config::DashConfig;
use crate::metadata::Record;
use regex_utils::slug::attribute_name;

const STYLE: &str = r#"
body{font-family:system-ui,sans-serif;background:#f5f6f8;margin:20px;color:#1f2328;}
h1{margin-bottom:8px;}
.toolbar{display:flex;flex-wrap:wrap;align-items:center;gap:6px;margin-bottom:12px;}
.toolbar label{font-size:14px;}
table{width:100%;border-collapse:collapse;table-layout:fixed;background:#fff;}
th,td{padding:8px;border-bottom:1px solid #ddd;overflow-wrap:break-word;text-align:left;}
th{background:#eee;cursor:pointer;user-select:none;}
th[data-order="asc"]::after{content:" \25B2";}
th[data-order="desc"]::after{content:" \25BC";}
td.editable{background:#f9f7ff;border-radius:4px;}
td.editable[contenteditable="true"]{outline:2px solid #7c3aed;background:#f2ebff;}
select,button,input{padding:6px 10px;border-radius:4px;border:1px solid #ccc;}
#count{margin-left:auto;font-size:13px;color:#57606a;}
"#;

const SCRIPT: &str = r##"
(function(){
const table=document.getElementById('records');
const body=table.querySelector('tbody');
const filters=Array.from(document.querySelectorAll('select[data-filter]'));
const search=document.getElementById('search');
const count=document.getElementById('count');
const editToggle=document.getElementById('editToggle');
const saveBtn=document.getElementById('saveBtn');
let editMode=false;

function applyFilters(){
  const needle=search.value.trim().toLowerCase();
  let shown=0;
  body.querySelectorAll('tr').forEach(row=>{
    const ok=filters.every(sel=>!sel.value||row.getAttribute('data-'+sel.dataset.filter)===sel.value)
      &&(!needle||row.textContent.toLowerCase().includes(needle));
    row.style.display=ok?'':'none';
    if(ok)shown++;
  });
  count.textContent=shown+' / '+body.rows.length;
}

function sortBy(th,index){
  const order=th.dataset.order==='asc'?'desc':'asc';
  table.querySelectorAll('th').forEach(h=>delete h.dataset.order);
  th.dataset.order=order;
  const numeric=th.dataset.type==='number';
  const rows=Array.from(body.rows);
  rows.sort((a,b)=>{
    const x=a.cells[index].textContent.trim();
    const y=b.cells[index].textContent.trim();
    const cmp=numeric?(parseFloat(x)||0)-(parseFloat(y)||0):x.localeCompare(y,undefined,{numeric:true,sensitivity:'base'});
    return order==='asc'?cmp:-cmp;
  });
  rows.forEach(r=>body.appendChild(r));
}

filters.forEach(sel=>sel.addEventListener('change',applyFilters));
search.addEventListener('input',applyFilters);
table.querySelectorAll('th').forEach((th,i)=>th.addEventListener('click',()=>sortBy(th,i)));

editToggle.addEventListener('click',()=>{
  editMode=!editMode;
  body.querySelectorAll('td.editable').forEach(c=>c.contentEditable=editMode?'true':'false');
  saveBtn.style.display=editMode?'':'none';
  editToggle.textContent=editMode?'Exit Edit Mode':'Edit Mode';
});

saveBtn.addEventListener('click',async()=>{
  const token=prompt('Enter admin token');
  if(!token){alert('Admin token required');return;}
  const updates=Array.from(body.rows).map(row=>{
    const update={path:row.dataset.path};
    row.querySelectorAll('td.editable').forEach(c=>{update[c.dataset.field]=c.textContent.trim();});
    return update;
  });
  try{
    const res=await fetch('/save',{method:'POST',headers:{'Content-Type':'application/json'},body:JSON.stringify({admin_token:token,updates:updates})});
    const result=await res.json();
    alert(result.msg);
    if(result.status==='success'||result.status==='partial')location.reload();
  }catch(e){alert('Save failed: '+e);}
});

applyFilters();
})();
"##;

/// Escape text for HTML element content and quoted attributes
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Lowercased, trimmed value used in `data-*` attributes and filter options
fn filter_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Renders records as an interactive HTML page
pub struct HtmlRenderer<'a> {
    config: &'a DashConfig,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(config: &'a DashConfig) -> Self {
        Self { config }
    }

    fn detail_fields(&self) -> Vec<&'a str> {
        self.config.schema.names().filter(|name| *name != self.config.anchor_field).collect()
    }

    fn topic(&self, record: &Record) -> String {
        record.topic_under(&self.config.root, &self.config.default_topic)
    }

    /// Distinct values per filter, keyed by filter key, labelled by first spelling seen
    fn filter_options(&self, records: &[Record]) -> Vec<(String, String, BTreeMap<String, String>)> {
        let mut filters = Vec::new();

        let mut topics = BTreeMap::new();
        for record in records {
            let topic = self.topic(record);
            topics.entry(topic.clone()).or_insert_with(|| title_case(&topic));
        }
        filters.push(("type".to_string(), "Type".to_string(), topics));

        for name in self.detail_fields() {
            let mut values = BTreeMap::new();
            for record in records.iter().filter(|r| !r.is_blank(name)) {
                let value = record.get(name).trim();
                values.entry(filter_key(value)).or_insert_with(|| value.to_string());
            }
            filters.push((attribute_name(name), name.to_string(), values));
        }

        filters
    }

    fn render_filters(&self, records: &[Record]) -> String {
        let mut out = String::new();
        for (attribute, label, options) in self.filter_options(records) {
            out.push_str(&format!(
                "<label>{label}: <select data-filter=\"{attr}\"><option value=\"\">All</option>",
                label = escape(&label),
                attr = escape(&attribute)
            ));
            for (key, text) in options {
                out.push_str(&format!("<option value=\"{}\">{}</option>", escape(&key), escape(&text)));
            }
            out.push_str("</select></label>\n");
        }
        out
    }

    fn render_row(&self, number: usize, record: &Record) -> String {
        let path = super::display_path(&record.path);
        let mut attrs = format!(
            "data-path=\"{}\" data-type=\"{}\"",
            escape(&path),
            escape(&self.topic(record))
        );
        for name in self.detail_fields() {
            attrs.push_str(&format!(
                " data-{}=\"{}\"",
                attribute_name(name),
                escape(&filter_key(record.get(name)))
            ));
        }

        let mut row = format!("<tr {}>", attrs);
        row.push_str(&format!("<td>{}</td>", number));
        row.push_str(&format!("<td>{}</td>", escape(&record.label(&self.config.anchor_field))));
        row.push_str(&format!(
            "<td><a href=\"{}\" target=\"_blank\">Code</a></td>",
            escape(&link_target(&record.path))
        ));
        for name in self.detail_fields() {
            row.push_str(&format!(
                "<td class=\"editable\" data-field=\"{}\">{}</td>",
                escape(&name.to_lowercase()),
                escape(record.get(name))
            ));
        }
        if self.config.schema.get("Pattern").is_none() {
            row.push_str(&format!("<td>{}</td>", escape(&record.pattern())));
        }
        row.push_str("</tr>\n");
        row
    }

    pub fn render(&self, records: &[Record]) -> String {
        let title = escape(&self.config.title);

        let mut headers = format!(
            "<th data-type=\"number\">#</th><th>{}</th><th>Solution</th>",
            escape(&self.config.anchor_field)
        );
        for name in self.detail_fields() {
            headers.push_str(&format!("<th>{}</th>", escape(name)));
        }
        if self.config.schema.get("Pattern").is_none() {
            headers.push_str("<th>Pattern</th>");
        }

        let rows: String =
            records.iter().enumerate().map(|(i, record)| self.render_row(i + 1, record)).collect();

        let mut page = String::new();
        page.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        page.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n");
        page.push_str(&format!("<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n", title, STYLE));
        page.push_str(&format!("<h1>{}</h1>\n<div class=\"toolbar\">\n", title));
        page.push_str(&self.render_filters(records));
        page.push_str("<input id=\"search\" type=\"search\" placeholder=\"Search\">\n");
        page.push_str("<button id=\"editToggle\" type=\"button\">Edit Mode</button>\n");
        page.push_str("<button id=\"saveBtn\" type=\"button\" style=\"display:none;\">Save</button>\n");
        page.push_str("<span id=\"count\"></span>\n</div>\n");
        page.push_str(&format!(
            "<table id=\"records\"><thead><tr>{}</tr></thead>\n<tbody>\n{}</tbody></table>\n",
            headers, rows
        ));
        page.push_str(&format!("<script>{}</script>\n</body></html>\n", SCRIPT));
        page
    }
}

fn title_case(value: &str) -> String {
    value
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
