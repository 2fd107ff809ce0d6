use serde::{Deserialize, Serialize};

/// How a widget's records are presented.
///
/// Every variant carries its own required sub-fields; the renderer matches on
/// this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Layout {
  List(ListLayout),
  Table(TableLayout),
  Cards(CardsLayout),
  Metric(MetricLayout),
  Chart(ChartLayout),
}

impl Layout {
  /// The `type` tag as written in the definition.
  pub fn kind(&self) -> &'static str {
    match self {
      Layout::List(_) => "list",
      Layout::Table(_) => "table",
      Layout::Cards(_) => "cards",
      Layout::Metric(_) => "metric",
      Layout::Chart(_) => "chart",
    }
  }

  /// Field names this layout references, in declaration order.
  pub fn referenced_fields(&self) -> Vec<&str> {
    let mut names = Vec::new();
    match self {
      Layout::List(list) => {
        names.push(list.fields.title.as_str());
        names.extend(
          [
            &list.fields.subtitle,
            &list.fields.description,
            &list.fields.badge,
            &list.fields.timestamp,
          ]
          .into_iter()
          .flatten()
          .map(String::as_str),
        );
      }
      Layout::Table(table) => {
        names.extend(table.columns.iter().map(|c| c.field.as_str()));
      }
      Layout::Cards(cards) => {
        names.push(cards.fields.title.as_str());
        names.extend(
          [
            &cards.fields.subtitle,
            &cards.fields.description,
            &cards.fields.image,
            &cards.fields.badge,
          ]
          .into_iter()
          .flatten()
          .map(String::as_str),
        );
      }
      Layout::Metric(metric) => {
        names.push(metric.value.as_str());
        if let Some(trend) = &metric.trend {
          names.push(trend.as_str());
        }
      }
      Layout::Chart(chart) => {
        names.push(chart.x_field.as_str());
        names.push(chart.y_field.as_str());
        if let Some(series) = &chart.series {
          names.push(series.as_str());
        }
      }
    }
    names
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListLayout {
  pub fields: ListFields,
}

/// Field names shown in each list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFields {
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtitle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub badge: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
  pub columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
  pub field: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub header: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub width: Option<u32>,
  #[serde(default)]
  pub sortable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardsLayout {
  pub fields: CardFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFields {
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtitle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub badge: Option<String>,
}

/// A single headline number, taken from the first record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLayout {
  /// Field holding the metric value.
  pub value: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  /// Field holding the trend delta.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trend: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
  Line,
  Bar,
  Area,
  Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartLayout {
  pub chart_type: ChartType,
  pub x_field: String,
  pub y_field: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub series: Option<String>,
}
