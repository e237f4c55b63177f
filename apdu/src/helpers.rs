// Copyright (c) 2023 The Beam Team

/// Encoding helper for byte array fields (pending nightly array constructors)
pub(crate) mod arr {
    use encdec::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::Length);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::Length);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Encoding helper for arrays of byte arrays (scalar pairs and the like)
pub(crate) mod arr2 {
    use encdec::Error;

    pub fn enc<const M: usize, const N: usize>(
        d: &[[u8; M]; N],
        buff: &mut [u8],
    ) -> Result<usize, Error> {
        if buff.len() < M * N {
            return Err(Error::Length);
        }

        for (i, v) in d.iter().enumerate() {
            buff[i * M..][..M].copy_from_slice(v);
        }

        Ok(M * N)
    }

    pub fn enc_len<const M: usize, const N: usize>(_d: &[[u8; M]; N]) -> Result<usize, Error> {
        Ok(M * N)
    }

    pub fn dec<const M: usize, const N: usize>(
        buff: &[u8],
    ) -> Result<([[u8; M]; N], usize), Error> {
        if buff.len() < M * N {
            return Err(Error::Length);
        }

        let mut d = [[0u8; M]; N];
        for (i, v) in d.iter_mut().enumerate() {
            v.copy_from_slice(&buff[i * M..][..M]);
        }

        Ok((d, M * N))
    }
}

/// Encoding helper for fixed arrays of encodable objects
pub(crate) mod items {
    use encdec::{Decode, Encode};

    use crate::ApduError;

    pub fn enc<T: Encode<Error = ApduError>, const N: usize>(
        d: &[T; N],
        buff: &mut [u8],
    ) -> Result<usize, ApduError> {
        let mut index = 0;

        for v in d {
            index += v.encode(&mut buff[index..])?;
        }

        Ok(index)
    }

    pub fn enc_len<T: Encode<Error = ApduError>, const N: usize>(
        d: &[T; N],
    ) -> Result<usize, ApduError> {
        let mut len = 0;

        for v in d {
            len += v.encode_len()?;
        }

        Ok(len)
    }

    pub fn dec<'a, T, const N: usize>(buff: &'a [u8]) -> Result<([T; N], usize), ApduError>
    where
        T: Decode<'a, Output = T, Error = ApduError> + Default + Copy,
    {
        let mut index = 0;
        let mut d = [T::default(); N];

        for v in d.iter_mut() {
            let (o, n) = T::decode(&buff[index..])?;
            *v = o;
            index += n;
        }

        Ok((d, index))
    }
}
