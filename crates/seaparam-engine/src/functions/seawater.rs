//! EOS-80 seawater routines (UNESCO 1983 technical paper 44).
//!
//! Temperatures are ITS-90 unless the name says otherwise, salinity is
//! PSS-78, pressure is in decibars, latitude in degrees and depth in metres.

use super::{FunctionProvider, NativeFunction, ProviderUnavailable};

const T68_FACTOR: f64 = 1.00024;
const EARTH_ROTATION: f64 = 7.292e-5;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn t68conv(t90: f64) -> f64 {
    t90 * T68_FACTOR
}

pub fn t90conv(t68: f64) -> f64 {
    t68 / T68_FACTOR
}

/// Density of Standard Mean Ocean Water (kg/m3).
pub fn smow(t: f64) -> f64 {
    const A: [f64; 6] = [
        999.842594,
        6.793952e-2,
        -9.095290e-3,
        1.001685e-4,
        -1.120083e-6,
        6.536332e-9,
    ];
    let t68 = t68conv(t);
    A[0] + (A[1] + (A[2] + (A[3] + (A[4] + A[5] * t68) * t68) * t68) * t68) * t68
}

/// Density of seawater at atmospheric pressure (kg/m3).
pub fn dens0(s: f64, t: f64) -> f64 {
    const B: [f64; 5] = [8.24493e-1, -4.0899e-3, 7.6438e-5, -8.2467e-7, 5.3875e-9];
    const C: [f64; 3] = [-5.72466e-3, 1.0227e-4, -1.6546e-6];
    const D0: f64 = 4.8314e-4;
    let t68 = t68conv(t);
    smow(t)
        + (B[0] + (B[1] + (B[2] + (B[3] + B[4] * t68) * t68) * t68) * t68) * s
        + (C[0] + (C[1] + C[2] * t68) * t68) * s * s.sqrt()
        + D0 * s * s
}

/// Freezing point of seawater (ITS-90 degC).
pub fn fp(s: f64, p: f64) -> f64 {
    const A: [f64; 3] = [-0.0575, 1.710523e-3, -2.154996e-4];
    const B: f64 = -7.53e-4;
    t90conv(A[0] * s + A[1] * s * s.sqrt() + A[2] * s * s + B * p)
}

/// Depth (m) from pressure (Saunders & Fofonoff 1976).
pub fn dpth(p: f64, lat: f64) -> f64 {
    const C: [f64; 4] = [9.72659, -2.2512e-5, 2.279e-10, -1.82e-15];
    const GAM_DASH: f64 = 2.184e-6;
    let x = lat.abs().to_radians().sin().powi(2);
    let bot = 9.780318 * (1.0 + (5.2788e-3 + 2.36e-5 * x) * x) + GAM_DASH * 0.5 * p;
    let top = (((C[3] * p + C[2]) * p + C[1]) * p + C[0]) * p;
    top / bot
}

/// Pressure (db) from depth (Saunders 1981).
pub fn pres(depth: f64, lat: f64) -> f64 {
    let x = lat.abs().to_radians().sin();
    let c1 = 5.92e-3 + x * x * 5.25e-3;
    ((1.0 - c1) - ((1.0 - c1).powi(2) - 8.84e-6 * depth).sqrt()) / 4.42e-6
}

/// Acceleration due to gravity (m/s2) at height `z` metres above sea level.
pub fn g(lat: f64, z: f64) -> f64 {
    let sin2 = lat.to_radians().sin().powi(2);
    let surface = 9.780318 * (1.0 + (5.2788e-3 + 2.36e-5 * sin2) * sin2);
    surface / (1.0 + z / EARTH_RADIUS_M).powi(2)
}

/// Coriolis factor (1/s).
pub fn f(lat: f64) -> f64 {
    2.0 * EARTH_ROTATION * lat.to_radians().sin()
}

/// Secant bulk modulus K of seawater (bars).
pub fn seck(s: f64, t: f64, p: f64) -> f64 {
    let p = p / 10.0;
    let t68 = t68conv(t);
    let sr = s.sqrt();

    let aw = 3.239908 + (1.43713e-3 + (1.16092e-4 - 5.77905e-7 * t68) * t68) * t68;
    let bw = 8.50935e-5 + (-6.12293e-6 + 5.2787e-8 * t68) * t68;
    let kw = 19652.21
        + (148.4206 + (-2.327105 + (1.360477e-2 - 5.155288e-5 * t68) * t68) * t68) * t68;

    let a = aw + (2.2838e-3 + (-1.0981e-5 - 1.6078e-6 * t68) * t68 + 1.91075e-4 * sr) * s;
    let b = bw + (-9.9348e-7 + (2.0816e-8 + 9.1697e-10 * t68) * t68) * s;
    let k0 = kw
        + (54.6746
            + (-0.603459 + (1.09987e-2 - 6.1670e-5 * t68) * t68) * t68
            + (7.944e-2 + (1.6483e-2 - 5.3009e-4 * t68) * t68) * sr)
            * s;
    k0 + (a + b * p) * p
}

/// In situ density of seawater (kg/m3).
pub fn dens(s: f64, t: f64, p: f64) -> f64 {
    dens0(s, t) / (1.0 - (p / 10.0) / seck(s, t, p))
}

/// Specific volume anomaly (m3/kg) against S=35, T=0 at the same pressure.
pub fn svan(s: f64, t: f64, p: f64) -> f64 {
    1.0 / dens(s, t, p) - 1.0 / dens(35.0, 0.0, p)
}

/// Adiabatic temperature gradient (degC/db).
pub fn adtg(s: f64, t: f64, p: f64) -> f64 {
    let t68 = t68conv(t);
    let ds = s - 35.0;
    3.5803e-5
        + (8.5258e-6 + (-6.836e-8 + 6.6228e-10 * t68) * t68) * t68
        + (1.8932e-6 - 4.2393e-8 * t68) * ds
        + (1.8741e-8
            + (-6.7795e-10 + (8.733e-12 - 5.4481e-14 * t68) * t68) * t68
            + (-1.1351e-10 + 2.7759e-12 * t68) * ds)
            * p
        + (-4.6206e-13 + (1.8676e-14 - 2.1687e-16 * t68) * t68) * p * p
}

/// Potential temperature at reference pressure `pr` (Fofonoff 1977,
/// fourth-order Runge-Kutta).
pub fn ptmp(s: f64, t: f64, p: f64, pr: f64) -> f64 {
    let sqrt2 = std::f64::consts::SQRT_2;
    let del_p = pr - p;

    let mut del_th = del_p * adtg(s, t, p);
    let mut th = t68conv(t) + 0.5 * del_th;
    let mut q = del_th;

    del_th = del_p * adtg(s, t90conv(th), p + 0.5 * del_p);
    th += (1.0 - 1.0 / sqrt2) * (del_th - q);
    q = (2.0 - sqrt2) * del_th + (-2.0 + 3.0 / sqrt2) * q;

    del_th = del_p * adtg(s, t90conv(th), p + 0.5 * del_p);
    th += (1.0 + 1.0 / sqrt2) * (del_th - q);
    q = (2.0 + sqrt2) * del_th + (-2.0 - 3.0 / sqrt2) * q;

    del_th = del_p * adtg(s, t90conv(th), p + del_p);
    t90conv(th + (del_th - 2.0 * q) / 6.0)
}

/// In situ temperature from potential temperature `pt` referenced to `pr`.
pub fn temp(s: f64, pt: f64, p: f64, pr: f64) -> f64 {
    ptmp(s, pt, pr, p)
}

/// Potential density (kg/m3) at reference pressure `pr`.
pub fn pden(s: f64, t: f64, p: f64, pr: f64) -> f64 {
    dens(s, ptmp(s, t, p, pr), pr)
}

/// Speed of sound (m/s), Chen & Millero 1977.
pub fn svel(s: f64, t: f64, p: f64) -> f64 {
    let p = p / 10.0;
    let t = t68conv(t);

    let cw = (((-2.3643e-12 * t + 3.8504e-10) * t - 9.7729e-9) * p
        + ((((1.0405e-12 * t - 2.5335e-10) * t + 2.5974e-8) * t - 1.7107e-6) * t + 3.1260e-5))
        * p
        + ((((-6.1185e-10 * t + 1.3621e-7) * t - 8.1788e-6) * t + 6.8982e-4) * t + 0.153563);
    let cw = cw * p
        + ((((3.1464e-9 * t - 1.47800e-6) * t + 3.3420e-4) * t - 5.80852e-2) * t + 5.03711) * t
        + 1402.388;

    let a = (((-3.389e-13 * t + 6.649e-12) * t + 1.100e-10) * p
        + (((7.988e-12 * t - 1.6002e-10) * t + 9.1041e-9) * t - 3.9064e-7))
        * p
        + ((((-2.0122e-10 * t + 1.0507e-8) * t - 6.4885e-8) * t - 1.2580e-5) * t + 9.4742e-5);
    let a = a * p + (((-3.21e-8 * t + 2.006e-6) * t + 7.164e-5) * t - 1.262e-2) * t + 1.389;

    let b = -1.922e-2 - 4.42e-5 * t + (7.3637e-5 + 1.7945e-7 * t) * p;
    let d = 1.727e-3 - 7.9836e-6 * p;

    cw + a * s + b * s * s.sqrt() + d * s * s
}

const SAL_A: [f64; 6] = [0.0080, -0.1692, 25.3851, 14.0941, -7.0261, 2.7081];
const SAL_B: [f64; 6] = [0.0005, -0.0056, -0.0066, -0.0375, 0.0636, -0.0144];
const SAL_K: f64 = 0.0162;

/// Pressure correction coefficients of the conductivity ratio.
const RP_D: [f64; 4] = [3.426e-2, 4.464e-4, 4.215e-1, -3.107e-3];
const RP_E: [f64; 3] = [2.070e-5, -6.370e-10, 3.989e-15];

/// Conductivity ratio rt(T) of standard seawater S=35 at T over T=15.
pub fn salrt(t: f64) -> f64 {
    let t68 = t68conv(t);
    0.6766097 + (2.00564e-2 + (1.104259e-4 + (-6.9698e-7 + 1.0031e-9 * t68) * t68) * t68) * t68
}

/// Practical salinity from the temperature-corrected ratio `rt` (PSS-78).
pub fn sals(rt: f64, t: f64) -> f64 {
    let del_t = t68conv(t) - 15.0;
    let x = rt.sqrt();
    let poly = |c: &[f64; 6]| c[0] + (c[1] + (c[2] + (c[3] + (c[4] + c[5] * x) * x) * x) * x) * x;
    poly(&SAL_A) + del_t / (1.0 + SAL_K * del_t) * poly(&SAL_B)
}

/// Derivative of [`sals`] with respect to `rtx = sqrt(rt)`; `delt` is T68 - 15.
pub fn salds(rtx: f64, delt: f64) -> f64 {
    let deriv = |c: &[f64; 6]| {
        c[1] + (2.0 * c[2] + (3.0 * c[3] + (4.0 * c[4] + 5.0 * c[5] * rtx) * rtx) * rtx) * rtx
    };
    deriv(&SAL_A) + delt / (1.0 + SAL_K * delt) * deriv(&SAL_B)
}

/// Practical salinity from conductivity ratio `r` (C / C(35,15,0)).
pub fn salt(r: f64, t: f64, p: f64) -> f64 {
    let t68 = t68conv(t);
    let cp = p * (RP_E[0] + (RP_E[1] + RP_E[2] * p) * p);
    let rp = 1.0 + cp / (1.0 + (RP_D[0] + RP_D[1] * t68) * t68 + (RP_D[2] + RP_D[3] * t68) * r);
    sals(r / (rp * salrt(t)), t)
}

/// Conductivity ratio for salinity `s`; the inverse of [`salt`].
pub fn cndr(s: f64, t: f64, p: f64) -> f64 {
    const TOLERANCE: f64 = 1e-10;
    const MAX_ITERATIONS: usize = 100;

    let t68 = t68conv(t);
    let del_t = t68 - 15.0;

    let mut rtx = (s / 35.0).sqrt();
    let mut estimate = sals(rtx * rtx, t);
    for _ in 0..MAX_ITERATIONS {
        rtx += (s - estimate) / salds(rtx, del_t);
        estimate = sals(rtx * rtx, t);
        if (estimate - s).abs() < TOLERANCE {
            break;
        }
    }

    // r = x * rp(r) with x = rt * rt(T) is a quadratic in r.
    let x = rtx * rtx * salrt(t);
    let at = RP_D[2] + RP_D[3] * t68;
    let bt = 1.0 + (RP_D[0] + RP_D[1] * t68) * t68;
    let cp = p * (RP_E[0] + (RP_E[1] + RP_E[2] * p) * p);
    let b = bt - x * at;
    (-b + (b * b + 4.0 * at * x * (bt + cp)).sqrt()) / (2.0 * at)
}

/// Specific heat of seawater (J/(kg degC)), Millero et al. 1973.
pub fn cp(s: f64, t: f64, p: f64) -> f64 {
    let p = p / 10.0;
    let t = t68conv(t);
    let s32 = s * s.sqrt();

    let cp_st0 = (((2.093236e-5 * t - 2.654387e-3) * t + 0.1412855) * t - 3.720283) * t
        + 4217.4
        + (-7.64357 + (0.1072763 - 1.38385e-3 * t) * t) * s
        + (0.1770383 + (-4.07718e-3 + 5.148e-5 * t) * t) * s32;

    let del_cp0t0 = ((((6.136e-13 * t - 6.5637e-11) * t + 2.6380e-9) * t - 5.422e-8) * p
        + ((((2.2956e-11 * t - 4.0027e-9) * t + 2.87533e-7) * t - 1.08645e-5) * t + 2.4931e-4))
        * p
        + ((((1.7168e-8 * t + 2.0357e-6) * t - 3.13885e-4) * t + 1.45747e-2) * t - 4.9592e-1);
    let del_cp0t0 = del_cp0t0 * p;

    let del_cpstp = ((((-2.9179e-10 * t + 2.5941e-8) * t + 9.802e-7) * t - 1.28315e-4) * t
        + 4.9247e-3)
        * s
        + ((3.122e-8 * t - 1.517e-6) * t - 1.2331e-4) * s32;
    let del_cpstp = del_cpstp * p
        + ((((1.8448e-11 * t - 2.3905e-9) * t + 1.17054e-7) * t - 2.9558e-6) * s + 9.971e-8 * s32)
            * p
            * p
        + (((3.513e-13 * t - 1.7682e-11) * t + 5.540e-10) * s - 1.4300e-12 * t * s32) * p * p * p;

    cp_st0 + del_cp0t0 + del_cpstp
}

/// Weiss (1970) gas solubility coefficients `[a1..a4, b1..b3]`.
const WEISS_O2: [f64; 7] = [
    -173.4292, 249.6339, 143.3483, -21.8492, -0.033096, 0.014259, -0.0017000,
];
const WEISS_N2: [f64; 7] = [
    -172.4965, 248.4262, 143.0738, -21.7120, -0.049781, 0.025018, -0.0034861,
];
const WEISS_AR: [f64; 7] = [
    -173.5146, 245.4510, 141.8222, -21.8020, -0.034474, 0.014934, -0.0017729,
];

fn weiss_solubility(c: &[f64; 7], s: f64, t: f64) -> f64 {
    let tk = (t68conv(t) + 273.15) / 100.0;
    (c[0] + c[1] / tk + c[2] * tk.ln() + c[3] * tk + s * (c[4] + (c[5] + c[6] * tk) * tk)).exp()
}

/// Oxygen saturation (ml/l) from moist air at one atmosphere.
pub fn sat_o2(s: f64, t: f64) -> f64 {
    weiss_solubility(&WEISS_O2, s, t)
}

/// Nitrogen saturation (ml/l).
pub fn sat_n2(s: f64, t: f64) -> f64 {
    weiss_solubility(&WEISS_N2, s, t)
}

/// Argon saturation (ml/l).
pub fn sat_ar(s: f64, t: f64) -> f64 {
    weiss_solubility(&WEISS_AR, s, t)
}

/// Provider bundling the seawater routines above.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeawaterProvider;

impl FunctionProvider for SeawaterProvider {
    fn name(&self) -> &str {
        "seawater"
    }

    fn list_functions(&self) -> Result<Vec<NativeFunction>, ProviderUnavailable> {
        Ok(vec![
            NativeFunction::pure("T68conv", 1, |a| t68conv(a[0])),
            NativeFunction::pure("T90conv", 1, |a| t90conv(a[0])),
            NativeFunction::pure("smow", 1, |a| smow(a[0])),
            NativeFunction::pure("dens0", 2, |a| dens0(a[0], a[1])),
            NativeFunction::pure("fp", 2, |a| fp(a[0], a[1])),
            NativeFunction::pure("dpth", 2, |a| dpth(a[0], a[1])),
            NativeFunction::pure("pres", 2, |a| pres(a[0], a[1])),
            NativeFunction::pure("g", 1, |a| g(a[0], 0.0)),
            NativeFunction::pure("g", 2, |a| g(a[0], a[1])),
            NativeFunction::pure("f", 1, |a| f(a[0])),
            NativeFunction::pure("seck", 2, |a| seck(a[0], a[1], 0.0)),
            NativeFunction::pure("seck", 3, |a| seck(a[0], a[1], a[2])),
            NativeFunction::pure("dens", 3, |a| dens(a[0], a[1], a[2])),
            NativeFunction::pure("svan", 3, |a| svan(a[0], a[1], a[2])),
            NativeFunction::pure("adtg", 3, |a| adtg(a[0], a[1], a[2])),
            NativeFunction::pure("ptmp", 3, |a| ptmp(a[0], a[1], a[2], 0.0)),
            NativeFunction::pure("ptmp", 4, |a| ptmp(a[0], a[1], a[2], a[3])),
            NativeFunction::pure("temp", 3, |a| temp(a[0], a[1], a[2], 0.0)),
            NativeFunction::pure("temp", 4, |a| temp(a[0], a[1], a[2], a[3])),
            NativeFunction::pure("pden", 3, |a| pden(a[0], a[1], a[2], 0.0)),
            NativeFunction::pure("pden", 4, |a| pden(a[0], a[1], a[2], a[3])),
            NativeFunction::pure("svel", 3, |a| svel(a[0], a[1], a[2])),
            NativeFunction::pure("salrt", 1, |a| salrt(a[0])),
            NativeFunction::pure("sals", 2, |a| sals(a[0], a[1])),
            NativeFunction::pure("salds", 2, |a| salds(a[0], a[1])),
            NativeFunction::pure("salt", 3, |a| salt(a[0], a[1], a[2])),
            NativeFunction::pure("cndr", 3, |a| cndr(a[0], a[1], a[2])),
            NativeFunction::pure("cp", 3, |a| cp(a[0], a[1], a[2])),
            NativeFunction::pure("satO2", 2, |a| sat_o2(a[0], a[1])),
            NativeFunction::pure("satN2", 2, |a| sat_n2(a[0], a[1])),
            NativeFunction::pure("satAr", 2, |a| sat_ar(a[0], a[1])),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_smow_at_zero() {
        assert!(close(smow(0.0), 999.842594, 1e-9));
    }

    #[test]
    fn test_dens0_fresh_water_is_smow() {
        assert!(close(dens0(0.0, 12.5), smow(12.5), 1e-12));
        assert!(dens0(35.0, 5.0) > smow(5.0));
    }

    #[test]
    fn test_temperature_scale_round_trip() {
        assert!(close(t90conv(t68conv(17.3)), 17.3, 1e-12));
    }

    #[test]
    fn test_dpth_unesco_check_value() {
        assert!(close(dpth(10_000.0, 30.0), 9712.653, 0.01));
    }

    #[test]
    fn test_pres_surface_is_zero() {
        assert!(close(pres(0.0, 45.0), 0.0, 1e-9));
        assert!(pres(1000.0, 45.0) > 1000.0);
    }

    #[test]
    fn test_fp_standard_seawater() {
        assert!(close(fp(35.0, 0.0), -1.9218, 1e-3));
        assert!(fp(35.0, 500.0) < fp(35.0, 0.0));
    }

    #[test]
    fn test_gravity_and_coriolis() {
        assert!(close(g(0.0, 0.0), 9.780318, 1e-9));
        assert!(g(45.0, 1000.0) < g(45.0, 0.0));
        assert!(close(f(90.0), 2.0 * EARTH_ROTATION, 1e-15));
        assert!(close(f(0.0), 0.0, 1e-15));
    }

    #[test]
    fn test_provider_lists_overloads() {
        let fns = SeawaterProvider.list_functions().unwrap();
        let g_arities: Vec<usize> = fns.iter().filter(|f| f.name == "g").map(|f| f.arity).collect();
        assert_eq!(g_arities, vec![1, 2]);
        let dens = fns.iter().find(|f| f.name == "dens0").unwrap();
        assert!(dens.call(&[35.0]).is_err());
        assert!(close(dens.call(&[0.0, 0.0]).unwrap(), 999.842594, 1e-9));
    }

    // Check values from UNESCO technical paper 44 are given in IPTS-68.

    #[test]
    fn test_seck_unesco_check_values() {
        assert!(close(seck(0.0, 0.0, 0.0), 19652.21, 1e-6));
        assert!(close(seck(35.0, 0.0, 0.0), 21582.27006, 1e-4));
        assert!(close(seck(35.0, t90conv(30.0), 10_000.0), 27318.32472, 1e-3));
    }

    #[test]
    fn test_dens_unesco_check_values() {
        assert!(close(dens(35.0, 0.0, 0.0), 1028.10633, 1e-4));
        assert!(close(dens(35.0, 0.0, 10_000.0), 1070.95838, 1e-4));
        assert!(close(dens(35.0, t90conv(30.0), 10_000.0), 1060.55059, 1e-4));
        assert!(close(svan(35.0, 0.0, 10_000.0), 0.0, 1e-15));
    }

    #[test]
    fn test_potential_temperature_unesco_check_value() {
        let t = t90conv(40.0);
        assert!(close(adtg(40.0, t, 10_000.0), 3.255976e-4, 1e-9));
        assert!(close(t68conv(ptmp(40.0, t, 10_000.0, 0.0)), 36.89073, 1e-4));
        let pt = ptmp(40.0, t, 10_000.0, 0.0);
        assert!(close(temp(40.0, pt, 10_000.0, 0.0), t, 1e-5));
        assert!(close(pden(35.0, 0.0, 0.0, 0.0), dens(35.0, 0.0, 0.0), 1e-9));
        assert!(pden(35.0, 2.0, 4000.0, 0.0) < dens(35.0, 2.0, 4000.0));
    }

    #[test]
    fn test_svel_unesco_check_value() {
        assert!(close(svel(40.0, t90conv(40.0), 10_000.0), 1731.995, 1e-2));
    }

    #[test]
    fn test_salinity_unesco_check_values() {
        assert!(close(salrt(t90conv(15.0)), 1.0, 1e-6));
        assert!(close(sals(1.0, t90conv(15.0)), 35.0, 1e-4));
        assert!(close(salt(1.0, t90conv(15.0), 0.0), 35.0, 1e-4));
        assert!(close(salt(1.888091, t90conv(40.0), 10_000.0), 40.0, 1e-4));
        assert!(close(cndr(40.0, t90conv(40.0), 10_000.0), 1.888091, 1e-6));
        assert!(close(cndr(35.0, t90conv(15.0), 0.0), 1.0, 1e-8));
    }

    #[test]
    fn test_cp_unesco_check_value() {
        assert!(close(cp(40.0, t90conv(40.0), 10_000.0), 3849.500, 1e-2));
    }

    #[test]
    fn test_gas_saturation() {
        assert!(close(sat_o2(35.0, 10.0), 6.3, 0.1));
        assert!(sat_o2(35.0, 20.0) < sat_o2(35.0, 10.0));
        assert!(sat_o2(35.0, 10.0) < sat_o2(0.0, 10.0));
        assert!(sat_n2(35.0, 10.0) > sat_o2(35.0, 10.0));
        assert!(sat_ar(35.0, 10.0) < sat_o2(35.0, 10.0));
    }

    #[test]
    fn test_provider_defaults_reference_pressure() {
        let fns = SeawaterProvider.list_functions().unwrap();
        let ptmp3 = fns.iter().find(|f| f.name == "ptmp" && f.arity == 3).unwrap();
        let args = [35.0, 10.0, 2000.0];
        assert_eq!(ptmp3.call(&args).unwrap(), ptmp(35.0, 10.0, 2000.0, 0.0));
        assert!(fns.iter().all(|f| f.arity <= crate::functions::MAX_ARITY));
    }
}
