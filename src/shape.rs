//! Shape arithmetic shared by the tensor operations.

use crate::error::{Result, TensorError};

/// Number of elements in a shape. The scalar shape `[]` holds one element.
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Like [`numel`], but `None` when the count overflows `usize`.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Broadcast two shapes according to NumPy rules.
///
/// The shorter shape is padded with leading 1s, then each dimension must
/// either match or be 1 on one side.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let n = a.len().max(b.len());
    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let da = if i < n - a.len() { 1 } else { a[i - (n - a.len())] };
        let db = if i < n - b.len() { 1 } else { b[i - (n - b.len())] };
        if da == db || db == 1 {
            result.push(da);
        } else if da == 1 {
            result.push(db);
        } else {
            return Err(TensorError::Broadcast {
                lhs: a.to_vec(),
                rhs: b.to_vec(),
            });
        }
    }
    Ok(result)
}

/// Resolve a reshape target that may contain a single `-1` placeholder.
pub fn infer_reshape(numel: usize, target: &[isize]) -> Result<Vec<usize>> {
    let err = || TensorError::Reshape {
        numel,
        target: target.to_vec(),
    };

    let mut inferred = None;
    let mut known = 1usize;
    for (i, &d) in target.iter().enumerate() {
        match d {
            -1 if inferred.is_none() => inferred = Some(i),
            d if d >= 0 => known *= d as usize,
            _ => return Err(err()),
        }
    }

    let mut dims: Vec<usize> = target.iter().map(|&d| d.max(0) as usize).collect();
    match inferred {
        Some(i) => {
            if known == 0 || numel % known != 0 {
                return Err(err());
            }
            dims[i] = numel / known;
        }
        None if known != numel => return Err(err()),
        None => {}
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_rules() {
        assert_eq!(broadcast_shapes(&[3, 1], &[1, 2]).unwrap(), vec![3, 2]);
        assert_eq!(broadcast_shapes(&[2, 3], &[3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[], &[4, 5]).unwrap(), vec![4, 5]);
        assert!(broadcast_shapes(&[2, 3], &[4]).is_err());
    }

    #[test]
    fn reshape_inference() {
        assert_eq!(infer_reshape(12, &[3, 4]).unwrap(), vec![3, 4]);
        assert_eq!(infer_reshape(12, &[-1, 4]).unwrap(), vec![3, 4]);
        assert_eq!(infer_reshape(12, &[3, -1]).unwrap(), vec![3, 4]);
        assert!(infer_reshape(12, &[5, -1]).is_err());
        assert!(infer_reshape(12, &[-1, -1]).is_err());
        assert!(infer_reshape(12, &[3, 5]).is_err());
        assert!(infer_reshape(12, &[-2, 6]).is_err());
    }

    #[test]
    fn scalar_numel() {
        assert_eq!(numel(&[]), 1);
        assert_eq!(numel(&[2, 0, 3]), 0);
    }

    #[test]
    fn numel_overflow() {
        assert_eq!(checked_numel(&[2, 3]), Some(6));
        assert_eq!(checked_numel(&[]), Some(1));
        assert_eq!(checked_numel(&[4294967296, 4294967296, 4]), None);
        assert_eq!(checked_numel(&[usize::MAX, 0]), Some(0));
    }
}
