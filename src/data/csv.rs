//! CSV group dataset
//!
//! Each row is one sample point:
//!
//! ```text
//! group_id,label,x1,x2,...,xd
//! ```
//!
//! - Rows sharing a `group_id` form one group; groups keep the order in
//!   which their id first appears
//! - The label must be an integer and the same on every row of a group; an
//!   empty label field marks the group as unlabeled (test data)
//! - First row can be headers (automatically detected)
//! - Blank lines and lines starting with `#` are skipped

use crate::core::{Group, Result, SDMError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Groups of sample points read from a CSV file
#[derive(Debug, Clone)]
pub struct GroupDataset {
    ids: Vec<String>,
    groups: Vec<Group>,
    labels: Vec<Option<i32>>,
}

/// Rows of one group while reading
struct PendingGroup {
    id: String,
    label: Option<i32>,
    points: Vec<Vec<f64>>,
}

impl GroupDataset {
    /// Load a dataset from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SDMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut pending: Vec<PendingGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut seen_data = false;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(SDMError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !seen_data {
                seen_data = true;
                if Self::is_header_line(line) {
                    continue;
                }
            }

            let (id, label, point) = Self::parse_data_line(line, line_no + 1)?;
            match index.get(&id).copied() {
                Some(position) => {
                    let group = &mut pending[position];
                    if group.label != label {
                        return Err(SDMError::ParseError(format!(
                            "Line {}: group '{}' has inconsistent labels",
                            line_no + 1,
                            id
                        )));
                    }
                    group.points.push(point);
                }
                None => {
                    index.insert(id.clone(), pending.len());
                    pending.push(PendingGroup {
                        id,
                        label,
                        points: vec![point],
                    });
                }
            }
        }

        if pending.is_empty() {
            return Err(SDMError::EmptyDataset);
        }

        let mut dataset = GroupDataset {
            ids: Vec::with_capacity(pending.len()),
            groups: Vec::with_capacity(pending.len()),
            labels: Vec::with_capacity(pending.len()),
        };
        for group in pending {
            dataset.groups.push(Group::new(group.points)?);
            dataset.ids.push(group.id);
            dataset.labels.push(group.label);
        }

        let dim = dataset.groups[0].dim();
        if let Some(bad) = dataset.groups.iter().find(|g| g.dim() != dim) {
            return Err(SDMError::DimensionMismatch {
                expected: dim,
                actual: bad.dim(),
            });
        }

        Ok(dataset)
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() < 3 {
            return false;
        }

        // Headers have non-numeric feature columns
        let non_numeric_count = fields[2..]
            .iter()
            .filter(|field| field.parse::<f64>().is_err())
            .count();
        non_numeric_count * 2 > fields.len() - 2
    }

    /// Parse a CSV data line into (group id, label, point)
    fn parse_data_line(line: &str, line_no: usize) -> Result<(String, Option<i32>, Vec<f64>)> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();

        if fields.len() < 3 {
            return Err(SDMError::ParseError(format!(
                "Line {}: expected group_id,label,x1..xd, got: {}",
                line_no, line
            )));
        }

        let id = fields[0];
        if id.is_empty() {
            return Err(SDMError::ParseError(format!(
                "Line {}: empty group id",
                line_no
            )));
        }

        let label = match fields[1] {
            "" => None,
            text => Some(text.parse::<i32>().map_err(|_| {
                SDMError::ParseError(format!("Line {}: invalid label: {}", line_no, text))
            })?),
        };

        let point = fields[2..]
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field.parse::<f64>().map_err(|_| {
                    SDMError::ParseError(format!(
                        "Line {}: invalid value at column {}: {}",
                        line_no,
                        col + 3,
                        field
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok((id.to_string(), label, point))
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Dimension of every point
    pub fn dim(&self) -> usize {
        self.groups.first().map_or(0, |g| g.dim())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group ids in first-appearance order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Per-group labels, `None` for unlabeled groups
    pub fn raw_labels(&self) -> &[Option<i32>] {
        &self.labels
    }

    /// Labels of every group, or an error if any group is unlabeled
    pub fn labels(&self) -> Result<Vec<i32>> {
        self.labels
            .iter()
            .zip(&self.ids)
            .map(|(label, id)| {
                label.ok_or_else(|| {
                    SDMError::InvalidInput(format!("Group '{}' has no label", id))
                })
            })
            .collect()
    }

    pub fn is_labeled(&self) -> bool {
        self.labels.iter().all(|l| l.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_csv_basic() {
        let data = "a,1,0.5\na,1,0.7\nb,-1,2.0\na,1,0.6\n";
        let dataset = GroupDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 1);
        assert_eq!(dataset.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(dataset.labels().unwrap(), vec![1, -1]);
        assert_eq!(dataset.groups()[0].len(), 3);
        assert_eq!(dataset.groups()[1].points(), &[vec![2.0]]);
    }

    #[test]
    fn test_csv_interleaved_groups_keep_first_appearance_order() {
        let mut data = String::new();
        for row in 0..50 {
            for id in ["z", "m", "a"] {
                data.push_str(&format!("{},{},{}\n", id, id.len(), row));
            }
        }
        let dataset = GroupDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.ids(), &["z".to_string(), "m".to_string(), "a".to_string()]);
        assert!(dataset.groups().iter().all(|g| g.len() == 50));
        assert_eq!(dataset.groups()[1].points()[49], vec![49.0]);
    }

    #[test]
    fn test_csv_with_headers_and_comments() {
        let data = "# generated\ngroup,label,x,y\n\ng1,0,1.0,2.0\ng2,1,3.0,4.0\n";
        let dataset = GroupDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 2);
        assert!(dataset.is_labeled());
    }

    #[test]
    fn test_csv_unlabeled_groups() {
        let data = "t1,,0.1\nt1,,0.2\nt2,,1.0\n";
        let dataset = GroupDataset::from_reader(Cursor::new(data)).unwrap();

        assert!(!dataset.is_labeled());
        assert_eq!(dataset.raw_labels(), &[None, None]);
        assert!(matches!(dataset.labels(), Err(SDMError::InvalidInput(_))));
    }

    #[test]
    fn test_csv_inconsistent_label() {
        let data = "a,1,0.5\na,2,0.7\n";
        assert!(matches!(
            GroupDataset::from_reader(Cursor::new(data)),
            Err(SDMError::ParseError(_))
        ));
    }

    #[test]
    fn test_csv_dimension_mismatch() {
        let data = "a,1,0.5\nb,0,0.7,0.1\n";
        assert!(matches!(
            GroupDataset::from_reader(Cursor::new(data)),
            Err(SDMError::DimensionMismatch { .. })
        ));

        let ragged = "a,1,0.5\na,1,0.7,0.1\n";
        assert!(matches!(
            GroupDataset::from_reader(Cursor::new(ragged)),
            Err(SDMError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_csv_invalid_format() {
        // Too few fields
        assert!(GroupDataset::from_reader(Cursor::new("a,1\n")).is_err());
        // Invalid number
        assert!(GroupDataset::from_reader(Cursor::new("a,1,0.5\na,1,abc\n")).is_err());
        // Invalid label
        assert!(GroupDataset::from_reader(Cursor::new("a,x,0.5\n")).is_err());
        // Nothing but comments
        assert!(matches!(
            GroupDataset::from_reader(Cursor::new("# empty\n\n")),
            Err(SDMError::EmptyDataset)
        ));
    }

    #[test]
    fn test_is_header_line() {
        assert!(GroupDataset::is_header_line("group,label,x"));
        assert!(GroupDataset::is_header_line("id,y,x1,x2"));
        assert!(!GroupDataset::is_header_line("g1,1,0.5,0.25"));
        assert!(!GroupDataset::is_header_line("g1,1"));
    }
}
