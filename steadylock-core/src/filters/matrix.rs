//! Fixed-size linear algebra for the linear state filter
//!
//! Basic operations on const-generic arrays, no heap allocation. Sizes are
//! checked by the type system, so none of these functions can fail except
//! `invert`.

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f64; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type
pub type Vector<const N: usize> = [f64; N];

/// Pivots smaller than this are treated as singular
const SINGULAR_PIVOT: f64 = 1e-12;

/// Identity matrix
pub fn identity<const N: usize>() -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Scaled identity `s·I`
pub fn scaled_identity<const N: usize>(scale: f64) -> SquareMatrix<N> {
    let mut m = identity::<N>();
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = scale;
    }
    m
}

/// Matrix multiplication: A[R×K] × B[K×C]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
) -> Matrix<R, C> {
    let mut result = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            result[i][j] = (0..K).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    result
}

/// Matrix transpose: Aᵀ
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>) -> Matrix<C, R> {
    let mut result = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Element-wise A + B
pub fn add<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] += b[i][j];
        }
    }
    result
}

/// Element-wise A - B
pub fn subtract<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] -= b[i][j];
        }
    }
    result
}

/// Matrix-vector product y = A × x
pub fn matvec<const R: usize, const C: usize>(a: &Matrix<R, C>, x: &Vector<C>) -> Vector<R> {
    let mut result = [0.0; R];
    for i in 0..R {
        result[i] = (0..C).map(|j| a[i][j] * x[j]).sum();
    }
    result
}

/// A·B·Aᵀ, the congruence used by every covariance propagation
pub fn congruence<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &SquareMatrix<C>) -> SquareMatrix<R> {
    multiply(&multiply(a, b), &transpose(a))
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Floating-point error in covariance products breaks symmetry a little on
/// every step; this removes it.
pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Largest absolute asymmetry |A[i][j] - A[j][i]|
pub fn asymmetry<const N: usize>(matrix: &SquareMatrix<N>) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..N {
        for j in i + 1..N {
            worst = worst.max((matrix[i][j] - matrix[j][i]).abs());
        }
    }
    worst
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// Returns `None` if the matrix is singular.
pub fn invert<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut work = *a;
    let mut inv = identity::<N>();

    for k in 0..N {
        // Find pivot
        let mut pivot_row = k;
        let mut pivot_abs = work[k][k].abs();
        for i in (k + 1)..N {
            if work[i][k].abs() > pivot_abs {
                pivot_abs = work[i][k].abs();
                pivot_row = i;
            }
        }

        if pivot_abs < SINGULAR_PIVOT {
            return None;
        }

        if pivot_row != k {
            work.swap(k, pivot_row);
            inv.swap(k, pivot_row);
        }

        // Scale pivot row
        let pivot = work[k][k];
        for j in 0..N {
            work[k][j] /= pivot;
            inv[k][j] /= pivot;
        }

        // Eliminate column
        for i in 0..N {
            if i != k {
                let factor = work[i][k];
                if factor != 0.0 {
                    for j in 0..N {
                        work[i][j] -= factor * work[k][j];
                        inv[i][j] -= factor * inv[k][j];
                    }
                }
            }
        }
    }

    Some(inv)
}
