//! Precomputed lookup tables

/// Taps of the band-limited step kernel applied per discontinuity
pub const BLEP_TAPS: usize = 8;

/// Table points per output sample
pub(crate) const BLEP_OVERSAMPLING: usize = 16;

/// Minimum-phase band-limited step residual
///
/// Blackman-windowed sinc (4 zero crossings each side, cutoff at the output
/// Nyquist), made minimum-phase via the real cepstrum, integrated and
/// subtracted from a unit step. Entry `k` is the residual `k / 16` output
/// samples after the discontinuity: 1.0 at the edge, 0.0 after 8 samples.
#[rustfmt::skip]
pub(crate) static BLEP_TABLE: [f64; BLEP_TAPS * BLEP_OVERSAMPLING + 1] = [
    1.0, 0.9999986932289004, 0.9999916484260924, 0.9999692043630894,
    0.9999138993326616, 0.999797452075151, 0.9995773647602291, 0.9991933098025915,
    0.9985634488023839, 0.9975809268241401, 0.9961107556858081, 0.9939873849353372,
    0.9910132569373494, 0.9869586880795675, 0.9815633092117665, 0.9745392705857295,
    0.9655763878998689, 0.954349308950092, 0.9405266272201168, 0.9237818478626999,
    0.9038059083830938, 0.8803208661735595, 0.8530942546625486, 0.821953496479408,
    0.7867997173392071, 0.7476202725187638, 0.7044992341796528, 0.6576251906466901,
    0.6072957213394728, 0.5539180828592486, 0.49800572027922485, 0.4401704737621823,
    0.3811104866405923, 0.3215940565083062, 0.2624398642938207, 0.2044942371299936,
    0.148606236875656, 0.09560156307557643, 0.046256290666798705, 0.001271555690329662,
    -0.038749718459904825, -0.07332303442166554, -0.10209856090223957, -0.12487263613858857,
    -0.1415940047217188, -0.15236446792099723, -0.15743390044287509, -0.15718982739703846,
    -0.1521420186464637, -0.1429027730226835, -0.1301637617238327, -0.11467045846286994,
    -0.09719526351686314, -0.07851048355458756, -0.059362319711406375, -0.04044690801289064,
    -0.022389377955689405, -0.005726694019479117, 0.009105144827712186, 0.02177919346200108,
    0.032080816663911715, 0.03990623797651516, 0.04525669350671935, 0.04822872647815324,
    0.049001283431158504, 0.04782041151218053, 0.04498239788405756, 0.04081624061551037,
    0.03566629478259842, 0.029875878310810622, 0.023772521966620053, 0.01765541256381664,
    0.011785417153604039, 0.006377941699003742, 0.0015986831687490044, -0.0024378001951630424,
    -0.005666902961735776, -0.008070519030891843, -0.009671727131858043, -0.010528092793067545,
    -0.01072408824690041, -0.010363121823917076, -0.009559642254779677, -0.008431724860899381,
    -0.007094479087415673, -0.005654529088489957, -0.004205732317675848, -0.0028262141767911864,
    -0.0015766925942950483, -0.0005000165634412301, 0.00037821698582729546, 0.0010481763670779909,
    0.0015136346144367652, 0.0017893704688806134, 0.0018983550566799012, 0.0018689258387338814,
    0.0017321199866388026, 0.0015193118341592093, 0.0012602284097402716, 0.0009814268517328584,
    0.0007052423979955202, 0.0004491961060465455, 0.0002258139484576649, 4.280084697982911e-05,
    -9.650308630204663e-05, -0.00019248759461376608, -0.00024850092414507863, -0.0002700271960731637,
    -0.00026387506331282395, -0.00023742331793452642, -0.0001979794088551312, -0.0001522588480837861,
    -0.00010598143314433095, -6.362016075334154e-05, -2.8268898198957615e-05, -1.6221398908555784e-06,
    1.591961751723492e-05, 2.5032911690536785e-05, 2.7198078148327198e-05, 2.439492967065693e-05,
    1.878046030223679e-05, 1.2364984511181731e-05, 6.721768219697388e-06, 2.775332298421418e-06,
    7.036674299909507e-07, 5.097961941480378e-08, -3.0943802187266556e-08, -1.9726662303654052e-08,
    0.0,
];
